//! `ni` - node index: pack header plus fixed-width stage-node records.
//!
//! The only unciphered binary of a pack. The 512-byte header declares the
//! record geometry; stage records follow contiguously at the declared
//! offset.
//!
//! ## Header (512 bytes)
//! ```text
//! [0x00] FormatVersion (always 1)   (u16 LE)
//! [0x02] StoryVersion               (u16 LE)
//! [0x04] NodesListOffset (0x200)    (u32 LE)
//! [0x08] NodeSize (0x2C)            (u32 LE)
//! [0x0C] StageNodesCount            (u32 LE)
//! [0x10] ImageAssetsCount           (u32 LE)
//! [0x14] SoundAssetsCount           (u32 LE)
//! [0x18] FactoryDisabled            (u8)
//! [0x19] Zero padding to 0x200
//! ```
//!
//! ## Stage-node record (0x2C bytes)
//! ```text
//! [0x00] ImageSlotIndex             (i32 LE, -1 = none)
//! [0x04] AudioSlotIndex             (i32 LE, -1 = none)
//! [0x08] OkActionOffset             (i32 LE, -1 = none)
//! [0x0C] OkOptionsCount             (i32 LE)
//! [0x10] OkSelectedOption           (i32 LE)
//! [0x14] HomeActionOffset           (i32 LE, -1 = none)
//! [0x18] HomeOptionsCount           (i32 LE)
//! [0x1C] HomeSelectedOption        (i32 LE)
//! [0x20] WheelEnabled               (u16 LE, nonzero = on)
//! [0x22] OkEnabled                  (u16 LE)
//! [0x24] HomeEnabled                (u16 LE)
//! [0x26] PauseEnabled               (u16 LE)
//! [0x28] AutoplayEnabled            (u16 LE)
//! [0x2A] Padding                    (u16)
//! ```
//! Action offsets are word offsets into the `li` table; the option count
//! stored alongside is the length of the referenced run. Reconstructing
//! the action-node graph from these triples is done a level up, in
//! `StoryPack::from_binaries`.

use crate::utils::Cursor;
use crate::{Error, Result};

/// Size of the `ni` header in bytes.
pub const HEADER_SIZE: usize = 512;

/// Size of one stage-node record in bytes.
pub const NODE_SIZE: usize = 0x2C;

/// The only node-index format version this library understands.
pub const FORMAT_VERSION: u16 = 1;

/// Parsed `ni` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiHeader {
    /// Pack content version, chosen by the pack author.
    pub story_version: u16,
    /// Byte offset of the first stage record (normally [`HEADER_SIZE`]).
    pub nodes_offset: u32,
    /// Declared record stride (normally [`NODE_SIZE`]).
    pub node_size: u32,
    /// Number of stage-node records.
    pub stage_nodes_count: u32,
    /// Number of image slots in `ri`.
    pub image_assets_count: u32,
    /// Number of audio slots in `si`.
    pub sound_assets_count: u32,
    /// Nonzero on factory-installed packs.
    pub factory_disabled: bool,
}

/// One transition triple inside a stage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Word offset into `li`, `-1` when the transition is absent.
    pub action_offset: i32,
    /// Length of the referenced option run.
    pub options_count: i32,
    /// Option preselected when the transition fires.
    pub selected_option: i32,
}

impl TransitionRecord {
    /// Record value for an absent transition.
    pub const NONE: Self = Self {
        action_offset: -1,
        options_count: -1,
        selected_option: -1,
    };

    /// Whether this transition is present.
    pub fn is_some(&self) -> bool {
        self.action_offset >= 0
    }
}

/// One fixed-width stage-node record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Slot index into `ri`, `-1` when the node shows no image.
    pub image_index: i32,
    /// Slot index into `si`, `-1` when the node plays no audio.
    pub sound_index: i32,
    /// Transition taken on the OK button.
    pub ok: TransitionRecord,
    /// Transition taken on the HOME button.
    pub home: TransitionRecord,
    pub wheel_enabled: bool,
    pub ok_enabled: bool,
    pub home_enabled: bool,
    pub pause_enabled: bool,
    pub autoplay_enabled: bool,
}

impl NodeRecord {
    fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
        let image_index = cursor.i32()?;
        let sound_index = cursor.i32()?;
        let ok = TransitionRecord {
            action_offset: cursor.i32()?,
            options_count: cursor.i32()?,
            selected_option: cursor.i32()?,
        };
        let home = TransitionRecord {
            action_offset: cursor.i32()?,
            options_count: cursor.i32()?,
            selected_option: cursor.i32()?,
        };
        Ok(Self {
            image_index,
            sound_index,
            ok,
            home,
            wheel_enabled: cursor.u16()? != 0,
            ok_enabled: cursor.u16()? != 0,
            home_enabled: cursor.u16()? != 0,
            pause_enabled: cursor.u16()? != 0,
            autoplay_enabled: cursor.u16()? != 0,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        for value in [
            self.image_index,
            self.sound_index,
            self.ok.action_offset,
            self.ok.options_count,
            self.ok.selected_option,
            self.home.action_offset,
            self.home.options_count,
            self.home.selected_option,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for flag in [
            self.wheel_enabled,
            self.ok_enabled,
            self.home_enabled,
            self.pause_enabled,
            self.autoplay_enabled,
        ] {
            out.extend_from_slice(&(flag as u16).to_le_bytes());
        }
        // Trailing record padding.
        out.extend_from_slice(&0u16.to_le_bytes());
    }
}

/// Parsed `ni` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ni {
    pub header: NiHeader,
    /// Stage records in declaration order.
    pub nodes: Vec<NodeRecord>,
}

impl Ni {
    /// Parse a complete `ni` buffer.
    ///
    /// An unknown format version is fatal; the error names it. Each
    /// record is read at the header-declared stride, so packs written
    /// with a larger record size still decode.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);

        let format_version = cursor.u16()?;
        if format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(format_version));
        }
        let header = NiHeader {
            story_version: cursor.u16()?,
            nodes_offset: cursor.u32()?,
            node_size: cursor.u32()?,
            stage_nodes_count: cursor.u32()?,
            image_assets_count: cursor.u32()?,
            sound_assets_count: cursor.u32()?,
            factory_disabled: cursor.u8()? != 0,
        };
        if (header.node_size as usize) < NODE_SIZE {
            return Err(Error::Parse("declared node size too small"));
        }

        let mut nodes = Vec::with_capacity(header.stage_nodes_count as usize);
        for i in 0..header.stage_nodes_count as usize {
            cursor.seek(header.nodes_offset as usize + i * header.node_size as usize);
            nodes.push(NodeRecord::parse(&mut cursor)?);
        }

        Ok(Self { header, nodes })
    }

    /// Serialize into the on-device layout.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.nodes.len() * NODE_SIZE);

        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&self.header.story_version.to_le_bytes());
        out.extend_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
        out.extend_from_slice(&(NODE_SIZE as u32).to_le_bytes());
        out.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.header.image_assets_count.to_le_bytes());
        out.extend_from_slice(&self.header.sound_assets_count.to_le_bytes());
        out.push(self.header.factory_disabled as u8);
        out.resize(HEADER_SIZE, 0);

        for node in &self.nodes {
            node.write(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ni {
        Ni {
            header: NiHeader {
                story_version: 2,
                nodes_offset: HEADER_SIZE as u32,
                node_size: NODE_SIZE as u32,
                stage_nodes_count: 2,
                image_assets_count: 1,
                sound_assets_count: 2,
                factory_disabled: false,
            },
            nodes: vec![
                NodeRecord {
                    image_index: 0,
                    sound_index: -1,
                    ok: TransitionRecord {
                        action_offset: 0,
                        options_count: 1,
                        selected_option: 0,
                    },
                    home: TransitionRecord::NONE,
                    wheel_enabled: true,
                    ok_enabled: true,
                    home_enabled: false,
                    pause_enabled: false,
                    autoplay_enabled: false,
                },
                NodeRecord {
                    image_index: -1,
                    sound_index: 1,
                    ok: TransitionRecord::NONE,
                    home: TransitionRecord::NONE,
                    wheel_enabled: false,
                    ok_enabled: false,
                    home_enabled: true,
                    pause_enabled: true,
                    autoplay_enabled: true,
                },
            ],
        }
    }

    #[test]
    fn build_then_parse() {
        let ni = sample();
        let buf = ni.build();
        assert_eq!(buf.len(), HEADER_SIZE + 2 * NODE_SIZE);
        let parsed = Ni::parse(&buf).unwrap();
        assert_eq!(parsed, ni);
    }

    #[test]
    fn unknown_format_version_names_it() {
        let mut buf = sample().build();
        buf[0] = 9;
        match Ni::parse(&buf) {
            Err(Error::UnsupportedVersion(9)) => {}
            other => panic!("expected UnsupportedVersion(9), got {other:?}"),
        }
    }

    #[test]
    fn truncated_records_fail() {
        let buf = sample().build();
        assert!(matches!(
            Ni::parse(&buf[..HEADER_SIZE + NODE_SIZE + 4]),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn parse_honors_declared_stride() {
        // Rewrite the sample with a 48-byte stride; records must still
        // land on the declared boundaries.
        let ni = sample();
        let mut buf = Vec::new();
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&ni.header.story_version.to_le_bytes());
        buf.extend_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
        buf.extend_from_slice(&48u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.push(0);
        buf.resize(HEADER_SIZE, 0);
        for node in &ni.nodes {
            let mut record = Vec::new();
            node.write(&mut record);
            record.resize(48, 0);
            buf.extend_from_slice(&record);
        }
        let parsed = Ni::parse(&buf).unwrap();
        assert_eq!(parsed.nodes, ni.nodes);
        assert_eq!(parsed.header.node_size, 48);
    }
}
