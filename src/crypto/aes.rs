//! AES-128-CBC - generation-3 content cipher.
//!
//! Thin wrappers over the RustCrypto `aes` + `cbc` crates. Key and IV are
//! per-device, pulled from the device metadata by the caller.
//!
//! No padding scheme is applied: the on-device files keep their exact
//! plaintext length, so only whole 16-byte blocks inside the leading
//! [`BLOCK_SIZE`] region are ciphered and any trailing partial block
//! passes through.

use aes::Aes128;
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::crypto::BLOCK_SIZE;
use crate::{Error, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Encrypt the leading block of `data`; the remainder passes through.
pub fn encrypt_first_block(data: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let block = BLOCK_SIZE.min(data.len());
    let aligned = block / 16 * 16;
    if aligned == 0 {
        return data.to_vec();
    }

    let mut out = Aes128CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_vec_mut::<NoPadding>(&data[..aligned]);
    out.extend_from_slice(&data[aligned..]);
    out
}

/// Decrypt the leading block of `data`; the remainder passes through.
///
/// Returns [`Error::Cipher`] when the ciphered region cannot be decoded,
/// so a wrong key never degrades into silently returned garbage I/O.
pub fn decrypt_first_block(data: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Result<Vec<u8>> {
    let block = BLOCK_SIZE.min(data.len());
    let aligned = block / 16 * 16;
    if aligned == 0 {
        return Ok(data.to_vec());
    }

    let mut out = Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(&data[..aligned])
        .map_err(|_| Error::Cipher("AES-CBC decrypt failed"))?;
    out.extend_from_slice(&data[aligned..]);
    Ok(out)
}
