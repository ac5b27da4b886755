//! `ri` / `si` - fixed-width asset slot tables.
//!
//! Both index files share one format: an array of 12-byte records, one
//! per asset slot, with no header. Record `n` holds the device-relative
//! path of the asset stored in slot `n`, so the record index doubles as
//! the slot position.
//!
//! ## Record (12 bytes)
//! ```text
//! [0x00] Path "000\XXXXXXXX"  (backslash-separated, null-padded)
//! ```
//! `XXXXXXXX` is the zero-padded decimal slot position, which is also the
//! file name under `rf/000/` (images) or `sf/000/` (audio).
//!
//! The `ri` table indexes images, the `si` table audio. Slot positions in
//! each table are dense and contiguous, starting at 0.

use crate::utils::padded_string;
use crate::{Error, Result};

/// Size of one slot record in bytes.
pub const RECORD_SIZE: usize = 12;

/// A logical asset bound to a device slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIndexEntry {
    /// Caller-side asset name (file name or sentinel).
    pub name: String,
    /// Dense slot position, 0-based.
    pub position: u32,
}

/// On-device file name for a slot: zero-padded 8-digit decimal.
pub fn slot_name(position: u32) -> String {
    format!("{position:08}")
}

/// Encode an asset list into the slot-address table.
///
/// Record index equals slot position; the caller guarantees positions are
/// dense and unique (see `StoryPack` asset-list derivation).
pub fn build(entries: &[AssetIndexEntry]) -> Vec<u8> {
    let mut table = vec![0u8; entries.len() * RECORD_SIZE];
    for entry in entries {
        let record = format!("000\\{}", slot_name(entry.position));
        let start = entry.position as usize * RECORD_SIZE;
        table[start..start + RECORD_SIZE].copy_from_slice(record.as_bytes());
    }
    table
}

/// Decode the slot at `index` back into a device-relative path.
///
/// Path separators are normalized to `/`. An index past the end of the
/// table fails with [`Error::InvalidRange`].
pub fn asset_path(table: &[u8], index: u32) -> Result<String> {
    let start = index as usize * RECORD_SIZE;
    let record = table
        .get(start..start + RECORD_SIZE)
        .ok_or(Error::InvalidRange)?;
    Ok(padded_string(record).replace('\\', "/"))
}

/// Number of whole records in a table.
pub fn entry_count(table: &[u8]) -> usize {
    table.len() / RECORD_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(names: &[&str]) -> Vec<AssetIndexEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| AssetIndexEntry {
                name: name.to_string(),
                position: i as u32,
            })
            .collect()
    }

    #[test]
    fn round_trip_positions() {
        let table = build(&entries(&["cover.png", "a.mp3", "b.mp3"]));
        assert_eq!(table.len(), 3 * RECORD_SIZE);
        assert_eq!(asset_path(&table, 0).unwrap(), "000/00000000");
        assert_eq!(asset_path(&table, 2).unwrap(), "000/00000002");
    }

    #[test]
    fn out_of_range_index_fails() {
        let table = build(&entries(&["only.png"]));
        assert!(matches!(asset_path(&table, 1), Err(Error::InvalidRange)));
    }

    #[test]
    fn empty_table() {
        assert!(build(&[]).is_empty());
        assert_eq!(entry_count(&[]), 0);
        assert!(asset_path(&[], 0).is_err());
    }

    #[test]
    fn records_are_exactly_twelve_bytes() {
        let table = build(&entries(&["x"]));
        // "000\00000000" fills the record completely, no padding left.
        assert_eq!(&table[..RECORD_SIZE], b"000\\00000000");
    }
}
