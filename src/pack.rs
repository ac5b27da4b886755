//! Story graph model and its mapping to the on-device binaries.
//!
//! A pack is a graph of **stage nodes** (one presentable step: image,
//! audio, active controls, up to two outgoing transitions) and **action
//! nodes** (an ordered list of alternative stage nodes a transition fans
//! out into). The device stores this graph flattened:
//!
//! * stage nodes become fixed-width records in `ni`, addressed by record
//!   index;
//! * action nodes become consecutive runs in `li`, addressed by word
//!   offset - their identifiers are never stored;
//! * image/audio references become dense slot indices into `ri`/`si`.
//!
//! [`StoryPack::to_binaries`] performs the flattening in deterministic
//! first-seen order; [`StoryPack::from_binaries`] reconstructs a graph,
//! synthesizing identifiers for everything the binaries do not retain.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::formats::asset::{self, AssetIndexEntry};
use crate::formats::li;
use crate::formats::ni::{Ni, NiHeader, NodeRecord, TransitionRecord};
use crate::{Error, Result};

/// Sentinel asset name for enforced silence.
///
/// Audio slots that must exist but carry no meaningful sound reference
/// this name; the install pipeline substitutes a shared pre-baked blank
/// MP3 instead of looking it up in the caller's asset store.
pub const SILENCE_ASSET: &str = "~silence";

/// Which physical controls are active while a stage node is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlSettings {
    pub wheel: bool,
    pub ok: bool,
    pub home: bool,
    pub pause: bool,
    pub autoplay: bool,
    /// Whether playback resumes after a pause. Model-level only: the
    /// stage record has no field for it.
    #[serde(default)]
    pub pause_can_resume: bool,
}

/// An outgoing edge: which action node to enter and which of its options
/// starts selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Identifier of the target action node.
    pub action_node: String,
    /// Index preselected within the action node's option list.
    pub option_index: i32,
}

/// A single presentable unit of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageNode {
    /// Stable identity. The first stage node of a pack conventionally
    /// shares the pack's own UUID.
    pub uuid: Uuid,
    /// Image asset name, if the node shows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Audio asset name, if the node plays one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok_transition: Option<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_transition: Option<Transition>,
    pub control_settings: ControlSettings,
}

/// A fan-out point: the ordered alternatives reachable from a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNode {
    /// Identifier transitions refer to. Synthetic (`action_<offset>`)
    /// when the graph was reconstructed from a device.
    pub id: String,
    /// Stage-node identifiers, in presentation order.
    pub options: Vec<Uuid>,
}

/// A complete story pack graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPack {
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    /// Pack content version, stored in the `ni` header.
    pub version: u16,
    pub stage_nodes: Vec<StageNode>,
    pub action_nodes: Vec<ActionNode>,
}

/// Descriptive record persisted as the pack's `md` YAML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMetadata {
    pub uuid: Uuid,
    /// On-device content folder name (see [`uuid_to_ref`]).
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub pack_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_source: Option<String>,
    /// Thumbnail reference for presentation layers; not used on-device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Derive the on-device content folder name for a pack UUID: the last 8
/// hex digits, uppercased.
pub fn uuid_to_ref(uuid: &Uuid) -> String {
    let hex = uuid.simple().to_string();
    hex[hex.len() - 8..].to_uppercase()
}

/// The plaintext binary set one pack serializes into, plus the slot
/// assignments the asset files must follow.
#[derive(Debug, Clone)]
pub struct PackBinaries {
    pub ni: Vec<u8>,
    pub li: Vec<u8>,
    pub ri: Vec<u8>,
    pub si: Vec<u8>,
    /// Image slots in position order.
    pub image_assets: Vec<AssetIndexEntry>,
    /// Audio slots in position order.
    pub audio_assets: Vec<AssetIndexEntry>,
}

impl StoryPack {
    /// Distinct image assets in first-seen order, with dense positions.
    pub fn image_asset_list(&self) -> Vec<AssetIndexEntry> {
        distinct_assets(self.stage_nodes.iter().filter_map(|n| n.image.as_deref()))
    }

    /// Distinct audio assets in first-seen order, with dense positions.
    ///
    /// [`SILENCE_ASSET`] references get a slot like any other asset.
    pub fn audio_asset_list(&self) -> Vec<AssetIndexEntry> {
        distinct_assets(self.stage_nodes.iter().filter_map(|n| n.audio.as_deref()))
    }

    /// Check that every transition targets a declared action node.
    pub fn validate_transitions(&self) -> Result<()> {
        for node in &self.stage_nodes {
            for transition in [&node.ok_transition, &node.home_transition]
                .into_iter()
                .flatten()
            {
                if !self.action_nodes.iter().any(|a| a.id == transition.action_node) {
                    return Err(Error::Parse("transition references unknown action node"));
                }
            }
        }
        Ok(())
    }

    /// Flatten the graph into the plaintext `ni`/`li`/`ri`/`si` set.
    ///
    /// Stage records are assigned in declaration order. Action nodes get
    /// `li` word offsets cumulatively in declaration order, so encoding
    /// is deterministic for a given graph.
    pub fn to_binaries(&self) -> Result<PackBinaries> {
        self.validate_transitions()?;

        let image_assets = self.image_asset_list();
        let audio_assets = self.audio_asset_list();
        let image_slots: HashMap<&str, i32> = slot_map(&image_assets);
        let audio_slots: HashMap<&str, i32> = slot_map(&audio_assets);

        let stage_index: HashMap<Uuid, u32> = self
            .stage_nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.uuid, i as u32))
            .collect();

        // Lay out li and remember each action node's (offset, count).
        let mut runs = Vec::with_capacity(self.action_nodes.len());
        let mut action_layout: HashMap<&str, (i32, i32)> = HashMap::new();
        let mut next_offset = 0i32;
        for action in &self.action_nodes {
            let mut run = Vec::with_capacity(action.options.len());
            for option in &action.options {
                let index = stage_index
                    .get(option)
                    .ok_or(Error::Parse("action option references unknown stage node"))?;
                run.push(*index);
            }
            action_layout.insert(action.id.as_str(), (next_offset, run.len() as i32));
            next_offset += run.len() as i32;
            runs.push(run);
        }

        let nodes = self
            .stage_nodes
            .iter()
            .map(|node| NodeRecord {
                image_index: node
                    .image
                    .as_deref()
                    .map_or(-1, |name| image_slots[name]),
                sound_index: node
                    .audio
                    .as_deref()
                    .map_or(-1, |name| audio_slots[name]),
                ok: transition_record(&node.ok_transition, &action_layout),
                home: transition_record(&node.home_transition, &action_layout),
                wheel_enabled: node.control_settings.wheel,
                ok_enabled: node.control_settings.ok,
                home_enabled: node.control_settings.home,
                pause_enabled: node.control_settings.pause,
                autoplay_enabled: node.control_settings.autoplay,
            })
            .collect::<Vec<_>>();

        let ni = Ni {
            header: NiHeader {
                story_version: self.version,
                nodes_offset: crate::formats::ni::HEADER_SIZE as u32,
                node_size: crate::formats::ni::NODE_SIZE as u32,
                stage_nodes_count: nodes.len() as u32,
                image_assets_count: image_assets.len() as u32,
                sound_assets_count: audio_assets.len() as u32,
                factory_disabled: false,
            },
            nodes,
        };

        Ok(PackBinaries {
            ni: ni.build(),
            li: li::build(&runs),
            ri: asset::build(&image_assets),
            si: asset::build(&audio_assets),
            image_assets,
            audio_assets,
        })
    }

    /// Reconstruct a graph from plaintext device binaries.
    ///
    /// The first stage node receives the pack's UUID; every other
    /// identifier is freshly generated, since the binaries store none.
    /// Action nodes get synthetic `action_<offset>` identifiers. Title
    /// and description start empty; callers fill them in from the pack's
    /// `md` document when available.
    pub fn from_binaries(
        uuid: Uuid,
        ni_buf: &[u8],
        li_buf: &[u8],
        ri_buf: &[u8],
        si_buf: &[u8],
    ) -> Result<Self> {
        let ni = Ni::parse(ni_buf)?;

        let mut stage_nodes = Vec::with_capacity(ni.nodes.len());
        // (offset, count) pairs in first-seen order, for deterministic
        // action-node reconstruction.
        let mut action_counts: Vec<(i32, i32)> = Vec::new();

        for (i, record) in ni.nodes.iter().enumerate() {
            for transition in [&record.ok, &record.home] {
                if !transition.is_some() {
                    continue;
                }
                match action_counts
                    .iter()
                    .find(|(offset, _)| *offset == transition.action_offset)
                {
                    Some((_, count)) if *count != transition.options_count => {
                        return Err(Error::Parse(
                            "transitions disagree on an action node's option count",
                        ));
                    }
                    Some(_) => {}
                    None => {
                        action_counts.push((transition.action_offset, transition.options_count));
                    }
                }
            }

            stage_nodes.push(StageNode {
                uuid: if i == 0 { uuid } else { Uuid::new_v4() },
                image: slot_path(ri_buf, record.image_index, "image"),
                audio: slot_path(si_buf, record.sound_index, "audio"),
                ok_transition: decoded_transition(&record.ok),
                home_transition: decoded_transition(&record.home),
                control_settings: ControlSettings {
                    wheel: record.wheel_enabled,
                    ok: record.ok_enabled,
                    home: record.home_enabled,
                    pause: record.pause_enabled,
                    autoplay: record.autoplay_enabled,
                    pause_can_resume: false,
                },
            });
        }

        let mut action_nodes = Vec::with_capacity(action_counts.len());
        for (offset, count) in action_counts {
            let mut options = Vec::with_capacity(count as usize);
            for index in li::read_options(li_buf, offset as u32, count as u32) {
                match stage_nodes.get(index as usize) {
                    Some(node) => options.push(node.uuid),
                    None => {
                        warn!("action at offset {offset} references stage node {index} past the node table, skipped");
                    }
                }
            }
            action_nodes.push(ActionNode {
                id: format!("action_{offset}"),
                options,
            });
        }

        Ok(Self {
            uuid,
            title: String::new(),
            description: String::new(),
            version: ni.header.story_version,
            stage_nodes,
            action_nodes,
        })
    }
}

fn distinct_assets<'a>(names: impl Iterator<Item = &'a str>) -> Vec<AssetIndexEntry> {
    let mut entries: Vec<AssetIndexEntry> = Vec::new();
    for name in names {
        if !entries.iter().any(|e| e.name == name) {
            entries.push(AssetIndexEntry {
                name: name.to_string(),
                position: entries.len() as u32,
            });
        }
    }
    entries
}

fn slot_map(entries: &[AssetIndexEntry]) -> HashMap<&str, i32> {
    entries
        .iter()
        .map(|e| (e.name.as_str(), e.position as i32))
        .collect()
}

fn transition_record(
    transition: &Option<Transition>,
    layout: &HashMap<&str, (i32, i32)>,
) -> TransitionRecord {
    match transition {
        // validate_transitions ran first, the target is known.
        Some(t) => {
            let (action_offset, options_count) = layout[t.action_node.as_str()];
            TransitionRecord {
                action_offset,
                options_count,
                selected_option: t.option_index,
            }
        }
        None => TransitionRecord::NONE,
    }
}

fn decoded_transition(record: &TransitionRecord) -> Option<Transition> {
    record.is_some().then(|| Transition {
        action_node: format!("action_{}", record.action_offset),
        option_index: record.selected_option,
    })
}

fn slot_path(table: &[u8], index: i32, kind: &str) -> Option<String> {
    if index < 0 {
        return None;
    }
    match asset::asset_path(table, index as u32) {
        Ok(path) => Some(path),
        Err(_) => {
            warn!("{kind} slot {index} lies outside its index table, dropped");
            None
        }
    }
}
