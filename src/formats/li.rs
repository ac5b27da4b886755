//! `li` - linearized action-node option lists.
//!
//! A headerless array of 32-bit little-endian stage-node record indices.
//! Each action node owns one consecutive run inside the array; the `ni`
//! stage records address a run by its starting *word* offset (so byte
//! offset `word * 4`) plus an option count.
//!
//! The file carries no self-description at all - offsets and counts only
//! exist in the `ni` records that reference it.

use log::warn;

use crate::utils::Cursor;

/// Lay out option runs back to back, in the order given.
///
/// `runs[i]` is one action node's option list as stage-node record
/// indices; its starting word offset is the sum of the lengths of all
/// earlier runs (the same assignment the `ni` encoder uses).
pub fn build(runs: &[Vec<u32>]) -> Vec<u8> {
    let words: usize = runs.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(words * 4);
    for run in runs {
        for &index in run {
            out.extend_from_slice(&index.to_le_bytes());
        }
    }
    out
}

/// Read `count` stage-node indices starting at word `offset`.
///
/// Entries that fall outside the table are logged and skipped rather than
/// aborting: real-world device state is sometimes truncated and a partial
/// option list still lets the rest of the pack be recovered.
pub fn read_options(table: &[u8], offset: u32, count: u32) -> Vec<u32> {
    let mut cursor = Cursor::new(table);
    cursor.seek(offset as usize * 4);

    let mut options = Vec::with_capacity(count as usize);
    for i in 0..count {
        match cursor.u32() {
            Ok(index) => options.push(index),
            Err(_) => {
                warn!("option {i} of action at offset {offset} lies outside li, skipped");
                break;
            }
        }
    }
    options
}
