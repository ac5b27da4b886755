//! **luniikit** - a reusable Rust library for the Lunii storyteller
//! on-device pack formats.
//!
//! The device stores each interactive story pack as a small set of
//! reverse-engineered, offset-addressed binaries with partially
//! encrypted headers. This crate reads that layout back into an
//! abstract story graph and serializes a graph into it, including the
//! device-generation-specific ciphering and the transactional install
//! path.
//!
//! # Modules
//! | Module | Purpose |
//! |--------|---------|
//! | [`formats`] | Codecs for `ni`, `li`, `ri`/`si`, `.pi`, `.md`, `bt` |
//! | [`crypto`]  | Partial-block ciphering (XXTEA / AES-CBC) per device generation |
//! | [`pack`]    | Story graph model and graph ↔ binaries mapping |
//! | [`album`]   | Music-album graph synthesis from a flat track list |
//! | [`device`]  | Device session handle and pack-index operations |
//! | [`install`] | Staged, transactional pack installation |
//! | [`extract`] | Graph + asset recovery and portable backup archives |
//!
//! Presentation concerns (UI, project libraries, i18n) and media
//! transcoding live outside this crate; the install pipeline receives
//! decoded asset buffers and an [`install::MediaConverter`]
//! implementation from the caller.

pub mod album;
pub mod crypto;
pub mod device;
pub mod error;
pub mod extract;
pub mod formats;
pub mod install;
pub mod pack;
pub mod utils;

pub use error::{Error, Result};
