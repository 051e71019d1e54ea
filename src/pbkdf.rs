use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::{
    blowfish::Blowfish,
    error::{Error, Result},
};

/// Plaintext encrypted by each inner hash
pub const MAGIC: [u8; 32] = *b"OxychromaticBlowfishSwatDynamite";

const WORDS: usize = MAGIC.len() / 4;

/// Output size of one inner hash
pub const HASH_SIZE: usize = WORDS * 4;

/// Longest supported output
pub const MAX_OUTPUT_LEN: usize = HASH_SIZE * HASH_SIZE;

/// Longest supported salt
pub const MAX_SALT_LEN: usize = 1 << 20;

type Sha512Output = [u8; 64];

/// The bcrypt-like PRF over pre-hashed password and salt
fn bcrypt_hash(sha2pass: &Sha512Output, sha2salt: &Sha512Output, out: &mut [u8; HASH_SIZE]) {
    let mut state = Blowfish::init_state();
    state.expand_state(sha2salt, sha2pass);
    for _ in 0..64 {
        state.expand0_state(sha2salt);
        state.expand0_state(sha2pass);
    }

    let mut cdata = [0u32; WORDS];
    for (word, chunk) in cdata.iter_mut().zip(MAGIC.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for _ in 0..64 {
        state.encrypt_words(&mut cdata);
    }

    for (chunk, word) in out.chunks_exact_mut(4).zip(cdata.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    cdata.zeroize();
}

#[inline(always)]
fn sha512(parts: &[&[u8]]) -> Sha512Output {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Derive `output.len()` bytes from a password and salt with OpenBSD's bcrypt_pbkdf.
///
/// Output bytes are interleaved across blocks, so every byte depends on the full round count.
pub fn bcrypt_pbkdf(password: &[u8], salt: &[u8], rounds: u32, output: &mut [u8]) -> Result<()> {
    if rounds == 0
        || password.is_empty()
        || salt.is_empty()
        || output.is_empty()
        || output.len() > MAX_OUTPUT_LEN
        || salt.len() > MAX_SALT_LEN
    {
        return Err(Error::InvalidPbkdfParams);
    }

    let stride = output.len().div_ceil(HASH_SIZE);
    let amt = output.len().div_ceil(stride);

    let mut sha2pass = sha512(&[password]);
    let mut block = [0u8; HASH_SIZE];
    let mut tmp = [0u8; HASH_SIZE];

    for (count, offset) in (1u32..).zip(0..stride) {
        let mut sha2salt = sha512(&[salt, &count.to_be_bytes()[..]]);
        bcrypt_hash(&sha2pass, &sha2salt, &mut tmp);
        block = tmp;

        for _ in 1..rounds {
            sha2salt = sha512(&[&tmp[..]]);
            bcrypt_hash(&sha2pass, &sha2salt, &mut tmp);
            block.iter_mut().zip(tmp.iter()).for_each(|(b, t)| *b ^= t);
        }

        for (i, byte) in block.iter().take(amt).enumerate() {
            let Some(dest) = output.get_mut(i * stride + offset) else {
                break;
            };
            *dest = *byte;
        }

        sha2salt.zeroize();
    }

    sha2pass.zeroize();
    block.zeroize();
    tmp.zeroize();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_against_rustcrypto() {
        let cases: [(&[u8], &[u8], u32, usize); 6] = [
            (b"password", b"salt", 4, 32),
            (b"password", b"salt", 1, 16),
            (b"\x00\x01\x02", b"\xff", 2, 1),
            (b"correct horse", b"battery staple", 8, 64),
            (b"password", b"salt", 3, 33),
            (b"p", b"NaCl", 2, 100),
        ];

        for (password, salt, rounds, len) in cases {
            let mut ours = vec![0u8; len];
            let mut theirs = vec![0u8; len];
            bcrypt_pbkdf(password, salt, rounds, &mut ours).unwrap();
            bcrypt_pbkdf::bcrypt_pbkdf(password, salt, rounds, &mut theirs).unwrap();
            assert_eq!(ours, theirs, "rounds {} len {}", rounds, len);
        }
    }

    #[test]
    fn test_every_byte_written() {
        let mut output = [0u8; 48];
        bcrypt_pbkdf(b"password", b"salt", 2, &mut output).unwrap();
        // a zero byte is possible but 8 in a row is not
        assert!(output.chunks(8).all(|c| c.iter().any(|&b| b != 0)));
    }

    #[test]
    fn test_prefix_differs_with_length() {
        let mut short = [0u8; 32];
        let mut long = [0u8; 64];
        bcrypt_pbkdf(b"password", b"salt", 2, &mut short).unwrap();
        bcrypt_pbkdf(b"password", b"salt", 2, &mut long).unwrap();
        // strided output: the stride changes with the requested length
        assert_ne!(short[..], long[..32]);
    }

    #[test]
    fn test_invalid_params() {
        let mut out = [0u8; 32];
        assert_eq!(
            bcrypt_pbkdf(b"pw", b"salt", 0, &mut out),
            Err(Error::InvalidPbkdfParams)
        );
        assert_eq!(
            bcrypt_pbkdf(b"", b"salt", 1, &mut out),
            Err(Error::InvalidPbkdfParams)
        );
        assert_eq!(
            bcrypt_pbkdf(b"pw", b"", 1, &mut out),
            Err(Error::InvalidPbkdfParams)
        );
        assert_eq!(
            bcrypt_pbkdf(b"pw", b"salt", 1, &mut []),
            Err(Error::InvalidPbkdfParams)
        );
        let long_salt = vec![0x5au8; MAX_SALT_LEN + 1];
        assert_eq!(
            bcrypt_pbkdf(b"pw", &long_salt, 1, &mut out),
            Err(Error::InvalidPbkdfParams)
        );
        let mut huge = vec![0u8; MAX_OUTPUT_LEN + 1];
        assert_eq!(
            bcrypt_pbkdf(b"pw", b"salt", 1, &mut huge),
            Err(Error::InvalidPbkdfParams)
        );
    }
}
