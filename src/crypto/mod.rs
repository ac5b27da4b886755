//! Partial-block ciphering for on-device content files.
//!
//! The firmware decrypts every content file before streaming it. To keep
//! the per-file decode cost constant on the player hardware, only the
//! leading [`BLOCK_SIZE`] bytes of each file are ciphered; the remainder
//! is stored as plaintext. Which primitive covers that block depends on
//! the device generation:
//!
//! | Generation | Cipher      | Key material |
//! |------------|-------------|--------------|
//! | V2         | XXTEA (firmware variant) | fixed shared key; per-device key for the boot token only |
//! | V3         | AES-128-CBC | per-device key + IV from device metadata |
//!
//! [`CipherContext::new`] resolves the profile once into an
//! encrypt/decrypt pair; nothing downstream branches on the generation
//! again.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`xxtea`] | Firmware XXTEA variant (`1 + 52/n` rounds) |
//! | [`aes`]   | AES-128-CBC via the RustCrypto `aes`/`cbc` crates |

pub mod aes;
pub mod xxtea;

use crate::Result;

/// Number of leading bytes covered by the partial-block cipher.
///
/// Matches the device's documented file-header size; identical for every
/// ciphered file kind.
pub const BLOCK_SIZE: usize = 512;

/// Cipher parameters for one device generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceProfile {
    /// Generation-2 device. Content files use the fixed shared XXTEA key;
    /// `specific_key` binds the boot token to this one device.
    V2 { specific_key: [u8; 16] },
    /// Generation-3 device with per-device AES key material.
    V3 { key: [u8; 16], iv: [u8; 16] },
}

enum Primitive {
    Xxtea { key: [u32; 4] },
    Aes { key: [u8; 16], iv: [u8; 16] },
}

/// Resolved encrypt/decrypt pair for one device.
///
/// Stateless besides the bound key material; safe to reuse across files.
pub struct CipherContext {
    primitive: Primitive,
}

impl CipherContext {
    /// Bind the content cipher for `profile`.
    pub fn new(profile: &DeviceProfile) -> Self {
        let primitive = match profile {
            DeviceProfile::V2 { .. } => Primitive::Xxtea {
                key: xxtea::COMMON_KEY,
            },
            DeviceProfile::V3 { key, iv } => Primitive::Aes { key: *key, iv: *iv },
        };
        Self { primitive }
    }

    /// Bind an XXTEA context with an explicit key (boot-token signing).
    pub(crate) fn with_xxtea_key(key: [u32; 4]) -> Self {
        Self {
            primitive: Primitive::Xxtea { key },
        }
    }

    /// Encrypt the leading [`BLOCK_SIZE`] bytes of `data`.
    ///
    /// Buffers shorter than one block are ciphered whole (up to primitive
    /// alignment); bytes past the block boundary pass through unmodified.
    pub fn encrypt_first_block(&self, data: &[u8]) -> Vec<u8> {
        match &self.primitive {
            Primitive::Xxtea { key } => xxtea::encrypt_first_block(data, key),
            Primitive::Aes { key, iv } => aes::encrypt_first_block(data, key, iv),
        }
    }

    /// Decrypt the leading [`BLOCK_SIZE`] bytes of `data`.
    pub fn decrypt_first_block(&self, data: &[u8]) -> Result<Vec<u8>> {
        match &self.primitive {
            Primitive::Xxtea { key } => Ok(xxtea::decrypt_first_block(data, key)),
            Primitive::Aes { key, iv } => aes::decrypt_first_block(data, key, iv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_round_trip() {
        let profile = DeviceProfile::V2 {
            specific_key: [9; 16],
        };
        let ctx = CipherContext::new(&profile);
        let data: Vec<u8> = (0..=255).cycle().take(1024).collect();
        let ciphered = ctx.encrypt_first_block(&data);
        assert_eq!(ctx.decrypt_first_block(&ciphered).unwrap(), data);
    }

    #[test]
    fn v3_round_trip() {
        let profile = DeviceProfile::V3 {
            key: [3; 16],
            iv: [4; 16],
        };
        let ctx = CipherContext::new(&profile);
        let data: Vec<u8> = (0..=255).cycle().take(1024).collect();
        let ciphered = ctx.encrypt_first_block(&data);
        assert_eq!(ctx.decrypt_first_block(&ciphered).unwrap(), data);
    }
}
