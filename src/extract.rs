//! Pack extraction and portable backup.
//!
//! The inverse of installation: read a pack's binaries off the device,
//! reconstruct the story graph, recover the plaintext assets, and bundle
//! everything into a portable archive (`project.json` + `images/` +
//! `audio/`) that can be re-imported without the device.
//!
//! Extraction is deliberately tolerant. Real devices accumulate
//! imperfect state - missing metadata, truncated tables, deleted asset
//! files - and a partial backup is worth more than none, so per-asset
//! problems are logged and skipped. Only structural failures (missing
//! index binaries, unsupported versions, undecipherable headers) abort.

use std::collections::HashMap;
use std::fs;
use std::io::{Seek, Write};
use std::path::Path;

use log::warn;
use uuid::Uuid;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::crypto::CipherContext;
use crate::device::Device;
use crate::pack::{PackMetadata, SILENCE_ASSET, StoryPack};
use crate::{Error, Result};

/// Reconstruct a pack's story graph from its on-device binaries.
///
/// Stage-node identifiers other than the first are freshly generated;
/// action nodes get synthetic offset-derived identifiers (the binary
/// format never stored the originals). Title and description come from
/// the pack's `md` document when present, placeholders otherwise.
pub fn extract_pack(device: &Device, uuid: Uuid) -> Result<StoryPack> {
    let dir = device.pack_dir(&uuid);
    if !dir.is_dir() {
        return Err(Error::Storage("pack folder not found"));
    }
    let ctx = CipherContext::new(device.profile());

    let ni = fs::read(dir.join("ni"))?;
    let li = read_ciphered(&dir, "li", &ctx)?;
    let ri = read_ciphered(&dir, "ri", &ctx)?;
    let si = read_ciphered(&dir, "si", &ctx)?;

    let mut pack = StoryPack::from_binaries(uuid, &ni, &li, &ri, &si)?;

    match fs::read_to_string(dir.join("md")) {
        Ok(yaml) => match serde_yaml::from_str::<PackMetadata>(&yaml) {
            Ok(metadata) => {
                pack.title = metadata.title;
                pack.description = metadata.description;
            }
            Err(e) => warn!("unreadable metadata for pack {uuid}: {e}"),
        },
        Err(_) => {
            warn!("metadata missing for pack {uuid}");
            pack.title = "Extracted pack".into();
        }
    }

    Ok(pack)
}

/// Recover the plaintext asset files referenced by an extracted graph.
///
/// Returns a map from pack-relative path (`rf/<slot>` or `sf/<slot>`,
/// so images and audio sharing a slot number stay distinct) to the
/// decrypted bytes. Missing files are logged and skipped; the silence
/// sentinel is never materialized.
pub fn extract_pack_assets(
    device: &Device,
    uuid: Uuid,
    pack: &StoryPack,
) -> Result<HashMap<String, Vec<u8>>> {
    let dir = device.pack_dir(&uuid);
    let ctx = CipherContext::new(device.profile());
    let mut assets = HashMap::new();

    for (subdir, entries) in [
        ("rf", pack.image_asset_list()),
        ("sf", pack.audio_asset_list()),
    ] {
        for entry in entries {
            if entry.name == SILENCE_ASSET {
                continue;
            }
            let path = dir.join(subdir).join(&entry.name);
            let ciphered = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(_) => {
                    warn!("asset file missing: {}", path.display());
                    continue;
                }
            };
            match ctx.decrypt_first_block(&ciphered) {
                Ok(plain) => {
                    assets.insert(format!("{subdir}/{}", entry.name), plain);
                }
                Err(e) => warn!("cannot decipher {}: {e}", path.display()),
            }
        }
    }

    Ok(assets)
}

/// Suggested file name for a pack's backup archive.
pub fn backup_file_name(pack: &StoryPack) -> String {
    let title = pack
        .title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("backup_{}_{}.zip", title, pack.uuid)
}

/// Write the portable backup archive for an extracted pack.
///
/// Layout: `project.json` (the full story graph), `images/<slot>` and
/// `audio/<slot>` plaintext files. Assets are keyed as
/// [`extract_pack_assets`] returns them.
pub fn write_backup_archive<W: Write + Seek>(
    writer: W,
    pack: &StoryPack,
    assets: &HashMap<String, Vec<u8>>,
) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    zip.start_file("project.json", options)?;
    zip.write_all(&serde_json::to_vec_pretty(pack)?)?;

    for (folder, subdir, entries) in [
        ("images", "rf", pack.image_asset_list()),
        ("audio", "sf", pack.audio_asset_list()),
    ] {
        for entry in entries {
            let Some(data) = assets.get(&format!("{subdir}/{}", entry.name)) else {
                continue;
            };
            // Slot paths look like "000/00000001"; keep just the slot.
            let base = entry.name.rsplit('/').next().unwrap_or(&entry.name);
            zip.start_file(format!("{folder}/{base}"), options)?;
            zip.write_all(data)?;
        }
    }

    zip.finish()?;
    Ok(())
}

fn read_ciphered(dir: &Path, name: &str, ctx: &CipherContext) -> Result<Vec<u8>> {
    let bytes = fs::read(dir.join(name))?;
    ctx.decrypt_first_block(&bytes)
}
