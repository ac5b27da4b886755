//! `.pi` - device pack index.
//!
//! A headerless flat array of 16-byte UUIDs at the device root, listing
//! which packs are enabled and in what order the menu presents them.
//!
//! Mutations operate on the decoded list and rewrite the whole file: the
//! index is tiny (one entry per installed pack) and a partial in-place
//! patch could corrupt the ordering, so write amplification is the right
//! trade.

use uuid::Uuid;

use crate::{Error, Result};

/// Decode the index into its UUID list, preserving order.
pub fn parse(buf: &[u8]) -> Result<Vec<Uuid>> {
    if buf.len() % 16 != 0 {
        return Err(Error::Parse("pack index length is not a multiple of 16"));
    }
    Ok(buf
        .chunks_exact(16)
        .map(|chunk| Uuid::from_bytes(chunk.try_into().unwrap()))
        .collect())
}

/// Encode a UUID list back into the flat array.
pub fn build(uuids: &[Uuid]) -> Vec<u8> {
    let mut out = Vec::with_capacity(uuids.len() * 16);
    for uuid in uuids {
        out.extend_from_slice(uuid.as_bytes());
    }
    out
}

/// Append a pack. Fails with [`Error::DuplicatePack`] if already listed.
pub fn add(uuids: &mut Vec<Uuid>, uuid: Uuid) -> Result<()> {
    if uuids.contains(&uuid) {
        return Err(Error::DuplicatePack(uuid));
    }
    uuids.push(uuid);
    Ok(())
}

/// Remove a pack. Fails with [`Error::PackNotFound`] if absent.
pub fn remove(uuids: &mut Vec<Uuid>, uuid: Uuid) -> Result<()> {
    let index = uuids
        .iter()
        .position(|u| *u == uuid)
        .ok_or(Error::PackNotFound(uuid))?;
    uuids.remove(index);
    Ok(())
}

/// Move the entry at `from` so it ends up at `to`.
///
/// Both positions must be in bounds; on failure the list is untouched.
pub fn reorder(uuids: &mut Vec<Uuid>, from: usize, to: usize) -> Result<()> {
    let len = uuids.len();
    for position in [from, to] {
        if position >= len {
            return Err(Error::BadPosition { position, len });
        }
    }
    let uuid = uuids.remove(from);
    uuids.insert(to, uuid);
    Ok(())
}
