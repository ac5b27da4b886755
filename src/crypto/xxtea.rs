//! XXTEA (corrected block TEA) - generation-2 content cipher.
//!
//! The firmware deviates from published XXTEA in one way: it runs
//! `1 + 52/n` mixing rounds instead of the canonical `6 + 52/n`. Both
//! directions here implement that variant; data ciphered with a standard
//! XXTEA implementation will not decode on the device.
//!
//! Only the leading [`BLOCK_SIZE`] bytes of a buffer are ciphered, as
//! 32-bit little-endian words (at most 128 of them). A trailing partial
//! word inside the block and everything past the block boundary pass
//! through untouched.

use crate::crypto::BLOCK_SIZE;

const DELTA: u32 = 0x9E3779B9;

/// Shared key used by every generation-2 device for content files.
///
/// Big-endian source bytes `91 BD 7A 0A A7 54 40 A9 BB D4 9D 6C E0 DC C0 E3`.
pub const COMMON_KEY: [u32; 4] = [0x91BD_7A0A, 0xA754_40A9, 0xBBD4_9D6C, 0xE0DC_C0E3];

/// Interpret 16 key bytes as four little-endian words.
pub fn key_from_bytes(bytes: &[u8; 16]) -> [u32; 4] {
    std::array::from_fn(|i| u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap()))
}

#[inline]
fn mx(sum: u32, y: u32, z: u32, p: usize, e: u32, k: &[u32; 4]) -> u32 {
    (((z >> 5) ^ (y << 2)).wrapping_add((y >> 3) ^ (z << 4)))
        ^ ((sum ^ y).wrapping_add(k[((p as u32 & 3) ^ e) as usize] ^ z))
}

fn btea_encrypt(v: &mut [u32], k: &[u32; 4]) {
    let n = v.len();
    if n < 2 {
        return;
    }

    // Firmware quirk: 1 + 52/n rounds, not the canonical 6 + 52/n.
    let rounds = 1 + 52 / n;
    let mut sum: u32 = 0;
    let mut z = v[n - 1];

    for _ in 0..rounds {
        sum = sum.wrapping_add(DELTA);
        let e = (sum >> 2) & 3;

        for p in 0..n - 1 {
            let y = v[p + 1];
            v[p] = v[p].wrapping_add(mx(sum, y, z, p, e, k));
            z = v[p];
        }

        let y = v[0];
        v[n - 1] = v[n - 1].wrapping_add(mx(sum, y, z, n - 1, e, k));
        z = v[n - 1];
    }
}

fn btea_decrypt(v: &mut [u32], k: &[u32; 4]) {
    let n = v.len();
    if n < 2 {
        return;
    }

    let rounds = 1 + 52 / n;
    let mut sum = (rounds as u32).wrapping_mul(DELTA);
    let mut y = v[0];

    for _ in 0..rounds {
        let e = (sum >> 2) & 3;

        for p in (1..n).rev() {
            let z = v[p - 1];
            v[p] = v[p].wrapping_sub(mx(sum, y, z, p, e, k));
            y = v[p];
        }

        let z = v[n - 1];
        v[0] = v[0].wrapping_sub(mx(sum, y, z, 0, e, k));
        y = v[0];

        sum = sum.wrapping_sub(DELTA);
    }
}

/// Cipher the leading block of `data` in the given direction.
fn cipher_first_block(data: &[u8], key: &[u32; 4], encrypt: bool) -> Vec<u8> {
    let block = BLOCK_SIZE.min(data.len());
    let aligned = block / 4 * 4;
    if aligned < 8 {
        // Fewer than two words: XXTEA cannot mix, leave as-is.
        return data.to_vec();
    }

    let mut v: Vec<u32> = data[..aligned]
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes(w.try_into().unwrap()))
        .collect();

    if encrypt {
        btea_encrypt(&mut v, key);
    } else {
        btea_decrypt(&mut v, key);
    }

    let mut out = Vec::with_capacity(data.len());
    for word in v {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(&data[aligned..]);
    out
}

/// Encrypt the leading block of `data`; the remainder passes through.
pub fn encrypt_first_block(data: &[u8], key: &[u32; 4]) -> Vec<u8> {
    cipher_first_block(data, key, true)
}

/// Decrypt the leading block of `data`; the remainder passes through.
pub fn decrypt_first_block(data: &[u8], key: &[u32; 4]) -> Vec<u8> {
    cipher_first_block(data, key, false)
}
