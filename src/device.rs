//! Device session handle.
//!
//! A [`Device`] binds one mounted device root to the cipher profile its
//! generation requires. Every core operation takes the handle as an
//! explicit argument - there is no ambient "current device" state; the
//! application layer owns exactly one live handle and passes it around.
//!
//! ## Device root layout
//! ```text
//! .md              device metadata (see crate::formats::md)
//! .pi              pack index: flat 16-byte UUID array, install order
//! .content/<REF>/  one folder per installed pack
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use uuid::Uuid;

use crate::crypto::DeviceProfile;
use crate::formats::md::DeviceInfo;
use crate::formats::pi;
use crate::pack::{PackMetadata, uuid_to_ref};
use crate::{Error, Result};

/// Pack index file name at the device root.
const PACK_INDEX: &str = ".pi";
/// Device metadata file name at the device root.
const DEVICE_METADATA: &str = ".md";
/// Content area directory name at the device root.
const CONTENT_DIR: &str = ".content";

/// A listed pack: always a UUID, metadata when the pack's `md` document
/// is present and readable.
#[derive(Debug, Clone)]
pub struct PackShell {
    pub uuid: Uuid,
    pub metadata: Option<PackMetadata>,
}

/// An open session on one mounted device.
#[derive(Debug)]
pub struct Device {
    root: PathBuf,
    info: DeviceInfo,
    profile: DeviceProfile,
}

impl Device {
    /// Open a generation-2 device at `root`.
    ///
    /// Reads `.md` and derives the V2 profile from its key block. Fails
    /// with [`Error::Storage`] when the root or the key material is
    /// missing, or when the metadata schema belongs to a generation
    /// whose keys live off the device.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let info = read_info(&root)?;

        if !(1..=3).contains(&info.schema_version) {
            // Newer schema: the content key is not on the device, the
            // caller must supply it via open_with_profile.
            return Err(Error::Storage(
                "device requires externally supplied key material",
            ));
        }
        let specific_key = info
            .specific_key()
            .ok_or(Error::Storage("device metadata has no key block"))?;

        Ok(Self {
            root,
            info,
            profile: DeviceProfile::V2 { specific_key },
        })
    }

    /// Open a device at `root` with caller-supplied cipher material
    /// (required for generation-3 devices).
    pub fn open_with_profile(root: impl Into<PathBuf>, profile: DeviceProfile) -> Result<Self> {
        let root = root.into();
        let info = read_info(&root)?;
        Ok(Self {
            root,
            info,
            profile,
        })
    }

    /// Mounted device root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed device metadata.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Cipher profile for this device's generation.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Path of the content area.
    pub fn content_dir(&self) -> PathBuf {
        self.root.join(CONTENT_DIR)
    }

    /// Path of a pack's content folder.
    pub fn pack_dir(&self, uuid: &Uuid) -> PathBuf {
        self.content_dir().join(uuid_to_ref(uuid))
    }

    /// Installed pack UUIDs in menu order.
    ///
    /// A device with no index yet lists no packs.
    pub fn pack_uuids(&self) -> Result<Vec<Uuid>> {
        let path = self.root.join(PACK_INDEX);
        if !path.exists() {
            return Ok(Vec::new());
        }
        pi::parse(&fs::read(path)?)
    }

    /// Installed packs with their metadata, where readable.
    ///
    /// A missing or unparsable `md` document downgrades that entry to a
    /// bare UUID instead of failing the listing.
    pub fn list_packs(&self) -> Result<Vec<PackShell>> {
        let uuids = self.pack_uuids()?;
        let mut shells = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            let metadata = match fs::read_to_string(self.pack_dir(&uuid).join("md")) {
                Ok(yaml) => match serde_yaml::from_str(&yaml) {
                    Ok(metadata) => Some(metadata),
                    Err(e) => {
                        warn!("unreadable metadata for pack {uuid}: {e}");
                        None
                    }
                },
                Err(_) => None,
            };
            shells.push(PackShell { uuid, metadata });
        }
        Ok(shells)
    }

    /// Append a pack to the index. Fails on duplicates without touching
    /// the file.
    pub fn add_pack(&self, uuid: Uuid) -> Result<()> {
        let mut uuids = self.pack_uuids()?;
        pi::add(&mut uuids, uuid)?;
        self.write_pack_uuids(&uuids)
    }

    /// Remove a pack reference from the index. Fails when absent without
    /// touching the file. The pack's content folder is left in place.
    pub fn remove_pack(&self, uuid: Uuid) -> Result<()> {
        let mut uuids = self.pack_uuids()?;
        pi::remove(&mut uuids, uuid)?;
        self.write_pack_uuids(&uuids)
    }

    /// Move the pack at `from` to position `to` in the menu order.
    pub fn reorder_pack(&self, from: usize, to: usize) -> Result<()> {
        let mut uuids = self.pack_uuids()?;
        pi::reorder(&mut uuids, from, to)?;
        self.write_pack_uuids(&uuids)
    }

    fn write_pack_uuids(&self, uuids: &[Uuid]) -> Result<()> {
        fs::write(self.root.join(PACK_INDEX), pi::build(uuids))?;
        Ok(())
    }
}

fn read_info(root: &Path) -> Result<DeviceInfo> {
    if !root.is_dir() {
        return Err(Error::Storage("device root not found"));
    }
    let buf = fs::read(root.join(DEVICE_METADATA))
        .map_err(|_| Error::Storage("device metadata unreadable"))?;
    DeviceInfo::parse(&buf)
}
