//! `.md` - device-root metadata file.
//!
//! Describes the device itself (firmware, serial number, key material).
//! Two on-disk schema generations exist, distinguished by the leading
//! version word.
//!
//! ## Versions 1-3 (generation-2 hardware, binary fields)
//! ```text
//! [0x000] SchemaVersion        (u16 LE)
//! [0x006] FirmwareMajor        (u16 LE)
//! [0x008] FirmwareMinor        (u16 LE)
//! [0x00A] SerialNumber         (u64 BE; 0 / all-ones / 0xFFFF000000000000 = unset)
//! [0x100] KeyBlock             (64 bytes; leading 16 = device-specific cipher key)
//! ```
//!
//! ## Versions 6-7 (generation-3 hardware, ASCII fields)
//! ```text
//! [0x002] FirmwareMajor        (1 ASCII digit)
//! [0x004] FirmwareMinor        (1 ASCII digit)
//! [0x01A] SerialNumber         (24 ASCII bytes, space-padded)
//! ```
//! Generation-3 content key material is not stored here; it comes from
//! the vendor service and is supplied by the caller.

use crate::utils::Cursor;
use crate::{Error, Result};

/// Serial values that mean "never provisioned".
const SERIAL_UNSET: [u64; 3] = [0, u64::MAX, 0xFFFF_0000_0000_0000];

/// Parsed device metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Leading version word; 1-3 binary schema, 6-7 ASCII schema.
    pub schema_version: u16,
    pub firmware_major: u16,
    pub firmware_minor: u16,
    /// Zero-padded decimal serial, when the device has one.
    pub serial_number: Option<String>,
    /// Raw 64-byte key block at offset 256 (versions 1-3 only).
    pub key_block: Option<[u8; 64]>,
}

impl DeviceInfo {
    /// Parse a `.md` buffer. Unsupported schema versions are fatal.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);
        let schema_version = cursor.u16()?;

        match schema_version {
            1..=3 => {
                cursor.seek(6);
                let firmware_major = cursor.u16()?;
                let firmware_minor = cursor.u16()?;
                let serial = cursor.be_u64()?;
                let serial_number = (!SERIAL_UNSET.contains(&serial))
                    .then(|| format!("{serial:014}"));

                cursor.seek(256);
                let key_block = cursor
                    .bytes(64)
                    .ok()
                    .map(|b| <[u8; 64]>::try_from(b).unwrap());

                Ok(Self {
                    schema_version,
                    firmware_major,
                    firmware_minor,
                    serial_number,
                    key_block,
                })
            }
            6..=7 => {
                cursor.seek(2);
                let firmware_major = ascii_digit(cursor.u8()?)?;
                cursor.seek(4);
                let firmware_minor = ascii_digit(cursor.u8()?)?;
                cursor.seek(26);
                let serial = String::from_utf8_lossy(cursor.bytes(24)?).trim().to_string();
                let serial_number = (!serial.is_empty()).then_some(serial);

                Ok(Self {
                    schema_version,
                    firmware_major,
                    firmware_minor,
                    serial_number,
                    key_block: None,
                })
            }
            other => Err(Error::UnsupportedVersion(other)),
        }
    }

    /// Device-specific cipher key: leading 16 bytes of the key block.
    pub fn specific_key(&self) -> Option<[u8; 16]> {
        self.key_block
            .map(|block| block[..16].try_into().unwrap())
    }
}

fn ascii_digit(byte: u8) -> Result<u16> {
    if byte.is_ascii_digit() {
        Ok((byte - b'0') as u16)
    } else {
        Err(Error::Parse("firmware field is not an ASCII digit"))
    }
}
