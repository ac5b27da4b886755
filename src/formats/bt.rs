//! `bt` - device-binding boot token.
//!
//! A small companion binary required next to a pack's index files. Its
//! exact verification semantics live in the firmware and have only been
//! validated empirically; this module treats it as an opaque artifact
//! with one generator per device generation.
//!
//! * **V2**: the first 64 bytes of the already-ciphered `ri` table
//!   (zero-padded when the table is shorter), re-encrypted under the
//!   device-specific key. The token therefore binds the pack's ciphered
//!   header material to one physical device.
//! * **V3**: derived from the device key material alone (AES-CBC over a
//!   fixed-size zero block); independent of pack content.

use crate::crypto::{CipherContext, DeviceProfile, aes, xxtea};

/// Length of the V2 token source slice and of the V3 token.
const TOKEN_SIZE: usize = 64;

/// Generate the boot token for `profile`.
///
/// `ciphered_ri` is the `ri` table *after* first-block encryption, as it
/// will be written to the device; only V2 reads it. Tables shorter than
/// [`TOKEN_SIZE`] (packs with few image slots) are zero-padded.
pub fn generate(profile: &DeviceProfile, ciphered_ri: &[u8]) -> Vec<u8> {
    match profile {
        DeviceProfile::V2 { specific_key } => {
            let mut source = [0u8; TOKEN_SIZE];
            let len = ciphered_ri.len().min(TOKEN_SIZE);
            source[..len].copy_from_slice(&ciphered_ri[..len]);
            let ctx = CipherContext::with_xxtea_key(xxtea::key_from_bytes(specific_key));
            ctx.encrypt_first_block(&source)
        }
        DeviceProfile::V3 { key, iv } => aes::encrypt_first_block(&[0u8; TOKEN_SIZE], key, iv),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_token_binds_to_device_key() {
        let ri = vec![0x5Au8; 96];
        let a = generate(
            &DeviceProfile::V2 {
                specific_key: [1; 16],
            },
            &ri,
        );
        let b = generate(
            &DeviceProfile::V2 {
                specific_key: [2; 16],
            },
            &ri,
        );
        assert_eq!(a.len(), TOKEN_SIZE);
        assert_ne!(a, b);
    }

    #[test]
    fn v2_token_pads_short_ri() {
        let profile = DeviceProfile::V2 {
            specific_key: [1; 16],
        };
        // Two image slots: a 24-byte table, well under the token size.
        let short = vec![0xA5u8; 24];
        let token = generate(&profile, &short);
        assert_eq!(token.len(), TOKEN_SIZE);

        let mut padded = short.clone();
        padded.resize(TOKEN_SIZE, 0);
        assert_eq!(token, generate(&profile, &padded));
    }

    #[test]
    fn v3_token_ignores_pack_content() {
        let profile = DeviceProfile::V3 {
            key: [7; 16],
            iv: [8; 16],
        };
        let a = generate(&profile, &[0u8; 96]);
        let b = generate(&profile, &[0xFFu8; 96]);
        assert_eq!(a, b);
        assert_eq!(a.len(), TOKEN_SIZE);
    }
}
