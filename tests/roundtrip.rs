//! End-to-end install / extract round trips over a scratch device root.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use uuid::Uuid;

use luniikit::album::{AlbumTrack, MusicAlbum};
use luniikit::crypto::DeviceProfile;
use luniikit::device::Device;
use luniikit::extract::{extract_pack, extract_pack_assets, write_backup_archive};
use luniikit::install::{PassthroughConverter, install_pack};
use luniikit::pack::uuid_to_ref;

/// Fabricate a generation-2 `.md` metadata image.
fn v2_metadata(key: u8) -> Vec<u8> {
    let mut buf = vec![0u8; 512];
    buf[0..2].copy_from_slice(&1u16.to_le_bytes());
    buf[6..8].copy_from_slice(&2u16.to_le_bytes());
    buf[8..10].copy_from_slice(&22u16.to_le_bytes());
    buf[10..18].copy_from_slice(&1234u64.to_be_bytes());
    buf[256..320].fill(key);
    buf
}

fn scratch_v2_device() -> (tempfile::TempDir, Device) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".md"), v2_metadata(0x42)).unwrap();
    let device = Device::open(dir.path()).unwrap();
    (dir, device)
}

fn album() -> MusicAlbum {
    MusicAlbum {
        title: "Road Trip".into(),
        artist: "The Backseats".into(),
        cover: "cover.png".into(),
        tracks: vec![
            AlbumTrack {
                title: "One".into(),
                audio: "one.mp3".into(),
                image: Some("one.png".into()),
            },
            AlbumTrack {
                title: "Two".into(),
                audio: "two.mp3".into(),
                image: None,
            },
            AlbumTrack {
                title: "Three".into(),
                audio: "three.mp3".into(),
                image: None,
            },
        ],
    }
}

/// Distinct per-asset payloads, larger than one cipher block so the
/// partial-block boundary is exercised.
fn album_assets() -> HashMap<String, Vec<u8>> {
    ["cover.png", "one.png", "one.mp3", "two.mp3", "three.mp3"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            (
                name.to_string(),
                (0..700).map(|b| (b as u8).wrapping_add(i as u8)).collect(),
            )
        })
        .collect()
}

#[test]
fn install_lays_out_pack_folder() {
    let (dir, device) = scratch_v2_device();
    let pack = album().into_pack(Uuid::new_v4());
    let assets = album_assets();

    let metadata = install_pack(&device, &pack, &assets, &PassthroughConverter).unwrap();
    assert_eq!(metadata.ref_name, uuid_to_ref(&pack.uuid));

    let pack_dir = dir.path().join(".content").join(&metadata.ref_name);
    for file in ["ni", "li", "ri", "si", "bt", "md"] {
        assert!(pack_dir.join(file).is_file(), "{file} missing");
    }

    // 2 image slots (cover + per-track image), 3 audio slots.
    for slot in ["rf/000/00000000", "rf/000/00000001"] {
        assert!(pack_dir.join(slot).is_file(), "{slot} missing");
    }
    for slot in ["sf/000/00000000", "sf/000/00000001", "sf/000/00000002"] {
        assert!(pack_dir.join(slot).is_file(), "{slot} missing");
    }
    assert!(!pack_dir.join("rf/000/00000002").exists());

    // The pack is enabled in the index.
    assert_eq!(device.pack_uuids().unwrap(), vec![pack.uuid]);

    // ni is plaintext and self-describing; ri is not plaintext.
    let ni = fs::read(pack_dir.join("ni")).unwrap();
    let parsed = luniikit::formats::ni::Ni::parse(&ni).unwrap();
    assert_eq!(parsed.header.stage_nodes_count, 7);
    assert_eq!(parsed.header.image_assets_count, 2);
    assert_eq!(parsed.header.sound_assets_count, 3);
    let ri = fs::read(pack_dir.join("ri")).unwrap();
    assert!(!ri.starts_with(b"000\\"));
}

#[test]
fn extract_inverts_install() {
    let (_dir, device) = scratch_v2_device();
    let pack = album().into_pack(Uuid::new_v4());
    let assets = album_assets();
    install_pack(&device, &pack, &assets, &PassthroughConverter).unwrap();

    let extracted = extract_pack(&device, pack.uuid).unwrap();
    assert_eq!(extracted.uuid, pack.uuid);
    assert_eq!(extracted.title, pack.title);
    assert_eq!(extracted.stage_nodes.len(), 7);
    assert_eq!(extracted.action_nodes.len(), 5);
    assert_eq!(extracted.stage_nodes[0].uuid, pack.uuid);

    // Per-node structure survives the flattening.
    for (original, decoded) in pack.stage_nodes.iter().zip(&extracted.stage_nodes) {
        assert_eq!(
            original.control_settings.autoplay,
            decoded.control_settings.autoplay
        );
        assert_eq!(
            original.ok_transition.is_some(),
            decoded.ok_transition.is_some()
        );
    }

    // Recovered assets are the original plaintext, re-keyed by slot.
    let recovered = extract_pack_assets(&device, pack.uuid, &extracted).unwrap();
    assert_eq!(recovered.len(), 5);
    let cover_slot = &pack.image_asset_list()[0];
    assert_eq!(cover_slot.name, "cover.png");
    assert_eq!(recovered["rf/000/00000000"], assets["cover.png"]);
    assert_eq!(recovered["sf/000/00000000"], assets["one.mp3"]);

    // And they bundle into a readable backup.
    let mut buf = std::io::Cursor::new(Vec::new());
    write_backup_archive(&mut buf, &extracted, &recovered).unwrap();
    let mut archive = zip::ZipArchive::new(buf).unwrap();
    assert!(archive.by_name("project.json").is_ok());
    assert!(archive.by_name("audio/00000002").is_ok());
}

#[test]
fn v3_device_round_trips_with_aes() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let mut md = vec![b' '; 64];
    md[0..2].copy_from_slice(&6u16.to_le_bytes());
    md[2] = b'3';
    md[4] = b'0';
    md[26..40].copy_from_slice(b"24230012345678");
    fs::write(dir.path().join(".md"), md).unwrap();

    // Generation-3 key material comes from outside the device.
    assert!(Device::open(dir.path()).is_err());
    let device = Device::open_with_profile(
        dir.path(),
        DeviceProfile::V3 {
            key: [7; 16],
            iv: [9; 16],
        },
    )
    .unwrap();

    let pack = album().into_pack(Uuid::new_v4());
    let assets = album_assets();
    install_pack(&device, &pack, &assets, &PassthroughConverter).unwrap();

    let extracted = extract_pack(&device, pack.uuid).unwrap();
    assert_eq!(extracted.stage_nodes.len(), 7);
    let recovered = extract_pack_assets(&device, pack.uuid, &extracted).unwrap();
    assert_eq!(recovered["rf/000/00000001"], assets["one.png"]);
}

#[test]
fn remove_absent_uuid_leaves_index_unchanged() {
    let (dir, device) = scratch_v2_device();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    device.add_pack(a).unwrap();
    device.add_pack(b).unwrap();

    let index_path: &Path = &dir.path().join(".pi");
    let before = fs::read(index_path).unwrap();
    assert!(device.remove_pack(Uuid::new_v4()).is_err());

    assert_eq!(fs::read(index_path).unwrap(), before);
    assert_eq!(device.pack_uuids().unwrap(), vec![a, b]);
}

#[test]
fn missing_assets_skip_but_install_succeeds() {
    let (dir, device) = scratch_v2_device();
    let pack = album().into_pack(Uuid::new_v4());
    let mut assets = album_assets();
    assets.remove("two.mp3");

    install_pack(&device, &pack, &assets, &PassthroughConverter).unwrap();

    let pack_dir = dir.path().join(".content").join(uuid_to_ref(&pack.uuid));
    // Slot 1 ("two.mp3") was skipped; its neighbours were written.
    assert!(pack_dir.join("sf/000/00000000").is_file());
    assert!(!pack_dir.join("sf/000/00000001").exists());
    assert!(pack_dir.join("sf/000/00000002").is_file());
    // The pack is still enabled.
    assert_eq!(device.pack_uuids().unwrap(), vec![pack.uuid]);
}
