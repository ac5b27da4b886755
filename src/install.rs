//! Transactional pack installation.
//!
//! One call takes a story graph plus its raw assets all the way to an
//! enabled pack on the device:
//!
//! 1. flatten the graph into `ri`/`si`/`ni`/`li` and the boot token;
//! 2. stage every file in a scratch directory - index binaries first,
//!    then each asset converted, first-block ciphered and written into
//!    its slot;
//! 3. copy the fully staged tree into `.content/<REF>/` and only then
//!    append the pack to `.pi`.
//!
//! Asset work is strictly sequential: later binaries depend on slot
//! assignments from earlier steps, and neither the external converter
//! nor the device transport tolerates many concurrent writers. The
//! scratch directory is removed on every exit path (it is a
//! [`tempfile::TempDir`]); an aborted commit may leave a partial
//! `.content` folder behind, but never an enabled index entry.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::crypto::CipherContext;
use crate::device::Device;
use crate::formats::asset::{AssetIndexEntry, slot_name};
use crate::formats::bt;
use crate::pack::{PackMetadata, SILENCE_ASSET, StoryPack, uuid_to_ref};
use crate::{Error, Result};

/// External media conversion collaborator.
///
/// The core never transcodes: callers hand in decoded buffers with a
/// known media type and this trait produces player-compatible bytes.
/// Assets that are already in device format can go through
/// [`PassthroughConverter`].
pub trait MediaConverter {
    /// Convert an image asset to the device bitmap format.
    fn image_to_bitmap(&self, name: &str, data: &[u8]) -> Result<Vec<u8>>;
    /// Convert an audio asset to device MP3.
    fn audio_to_mp3(&self, name: &str, data: &[u8]) -> Result<Vec<u8>>;
}

/// Converter that hands buffers through unchanged.
pub struct PassthroughConverter;

impl MediaConverter for PassthroughConverter {
    fn image_to_bitmap(&self, _name: &str, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn audio_to_mp3(&self, _name: &str, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Shared blank audio substituted for [`SILENCE_ASSET`] slots.
///
/// MPEG-1 layer III, 32 kbit/s, 32 kHz, mono: eight 144-byte frames of
/// digital silence.
fn silence_mp3() -> Vec<u8> {
    let mut out = Vec::with_capacity(8 * 144);
    for _ in 0..8 {
        // 0x18: bitrate index 1 (32 kbit/s), 32 kHz, no padding - the
        // declared frame length is 144 * 32000 / 32000 = 144 bytes.
        out.extend_from_slice(&[0xFF, 0xFB, 0x18, 0xC0]);
        out.extend(std::iter::repeat_n(0u8, 140));
    }
    out
}

/// Install `pack` on `device`.
///
/// `assets` maps asset names (as referenced by the graph) to raw decoded
/// bytes. A missing or unconvertible asset is logged and its slot file
/// skipped - partial installs of imperfect material beat aborting a
/// multi-hundred-asset pack - but structural problems (unknown
/// transition targets, cipher or storage failures) abort before the
/// device is touched.
///
/// Returns the metadata written to the pack's `md` document.
pub fn install_pack(
    device: &Device,
    pack: &StoryPack,
    assets: &HashMap<String, Vec<u8>>,
    converter: &impl MediaConverter,
) -> Result<PackMetadata> {
    let ctx = CipherContext::new(device.profile());
    let binaries = pack.to_binaries()?;

    let metadata = PackMetadata {
        uuid: pack.uuid,
        ref_name: uuid_to_ref(&pack.uuid),
        title: pack.title.clone(),
        description: pack.description.clone(),
        author: None,
        pack_type: "custom".into(),
        install_source: Some(env!("CARGO_PKG_NAME").into()),
        image: None,
    };

    let staging = tempfile::tempdir().map_err(|_| Error::Storage("cannot create staging area"))?;
    let out = staging.path();
    debug!("staging pack {} in {}", pack.uuid, out.display());

    let ciphered_ri = ctx.encrypt_first_block(&binaries.ri);
    let token = bt::generate(device.profile(), &ciphered_ri);

    fs::write(out.join("ni"), &binaries.ni)?;
    fs::write(out.join("li"), ctx.encrypt_first_block(&binaries.li))?;
    fs::write(out.join("ri"), ciphered_ri)?;
    fs::write(out.join("si"), ctx.encrypt_first_block(&binaries.si))?;
    fs::write(out.join("bt"), token)?;

    stage_assets(
        out,
        "rf/000",
        &binaries.image_assets,
        &ctx,
        |name, data| converter.image_to_bitmap(name, data),
        assets,
    )?;
    stage_assets(
        out,
        "sf/000",
        &binaries.audio_assets,
        &ctx,
        |name, data| converter.audio_to_mp3(name, data),
        assets,
    )?;

    fs::write(out.join("md"), serde_yaml::to_string(&metadata)?)?;

    // Commit: copy the staged tree, then enable the pack in the index.
    let pack_dir = device.pack_dir(&pack.uuid);
    fs::create_dir_all(&pack_dir).map_err(|_| Error::Storage("cannot create pack folder"))?;
    copy_tree(out, &pack_dir)?;
    device.add_pack(pack.uuid)?;

    debug!("pack {} installed as {}", pack.uuid, metadata.ref_name);
    Ok(metadata)
}

fn stage_assets(
    out: &Path,
    subdir: &str,
    entries: &[AssetIndexEntry],
    ctx: &CipherContext,
    convert: impl Fn(&str, &[u8]) -> Result<Vec<u8>>,
    assets: &HashMap<String, Vec<u8>>,
) -> Result<()> {
    let dir = out.join(subdir);
    fs::create_dir_all(&dir)?;

    for entry in entries {
        let converted = if entry.name == SILENCE_ASSET {
            silence_mp3()
        } else {
            let Some(raw) = assets.get(&entry.name) else {
                warn!("missing asset: {}", entry.name);
                continue;
            };
            match convert(&entry.name, raw) {
                Ok(converted) => converted,
                Err(e) => {
                    warn!("conversion failed for {}: {e}", entry.name);
                    continue;
                }
            }
        };

        let ciphered = ctx.encrypt_first_block(&converted);
        fs::write(dir.join(slot_name(entry.position)), ciphered)?;
    }
    Ok(())
}

/// Recursively copy a staged directory into the destination.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_valid_frame_stream() {
        let mp3 = silence_mp3();

        // The header-declared frame length must match the emitted
        // stride, or a decoder's frame walk lands off the sync words.
        const BITRATES: [usize; 15] =
            [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
        let bitrate = BITRATES[(mp3[2] >> 4) as usize] * 1000;
        assert_eq!(mp3[2] & 0x0C, 0x08, "sample rate field must be 32 kHz");
        let declared = 144 * bitrate / 32_000;
        assert_eq!(declared, 144);

        assert_eq!(mp3.len() % declared, 0);
        for frame in mp3.chunks_exact(declared) {
            assert_eq!(&frame[..2], &[0xFF, 0xFB]);
        }
    }

    #[test]
    fn passthrough_converter_is_identity() {
        let converter = PassthroughConverter;
        assert_eq!(converter.image_to_bitmap("x", &[1, 2]).unwrap(), vec![1, 2]);
        assert_eq!(converter.audio_to_mp3("x", &[3]).unwrap(), vec![3]);
    }
}
