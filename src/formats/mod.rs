//! Codecs for the on-device binary formats.
//!
//! Each submodule targets one file kind. All codecs follow the same
//! conventions:
//!
//! * **Whole-buffer** - the index files cross-reference each other by
//!   absolute offsets, so codecs take fully loaded `&[u8]` buffers
//!   rather than streaming readers.
//! * **Plaintext only** - every codec sees already-decrypted bytes.
//!   Partial-block ciphering is applied separately via
//!   [`crate::crypto::CipherContext`] (`ni` is never ciphered; `li`,
//!   `ri`, `si`, `bt` and asset files are).
//! * **Graph-agnostic** - codecs deal in records, slots and offsets.
//!   Turning records into a story graph and back happens in
//!   [`crate::pack::StoryPack`].
//!
//! ## Format overview
//!
//! | Module   | File  | Description |
//! |----------|-------|-------------|
//! | [`ni`]   | `ni`  | Pack header + fixed-width stage-node records |
//! | [`li`]   | `li`  | Linearized action-node option runs, word-addressed |
//! | [`asset`]| `ri`/`si` | 12-byte asset slot-address tables |
//! | [`pi`]   | `.pi` | Device pack index: flat 16-byte UUID array |
//! | [`md`]   | `.md` | Device metadata, two schema generations |
//! | [`bt`]   | `bt`  | Generation-specific device-binding boot token |

pub mod asset;
pub mod bt;
pub mod li;
pub mod md;
pub mod ni;
pub mod pi;
