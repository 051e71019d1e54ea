use zeroize::Zeroize;

use crate::{
    blowfish::Blowfish,
    error::{Error, Result},
    format::{Cost, DIGEST_LEN, Salt, Setting, Version},
};

/// Password bytes beyond this are ignored
pub const MAX_PASSWORD_LEN: usize = 72;

/// The password plus its NUL terminator
const KEY_BUF_LEN: usize = MAX_PASSWORD_LEN + 1;

/// Plaintext encrypted by the final state
pub const MAGIC: [u8; 24] = *b"OrpheanBeholderScryDoubt";

const MAGIC_WORDS: usize = MAGIC.len() / 4;

/// The NUL terminated key fed to the key schedule, wiped on drop
pub(crate) struct Key {
    buf: [u8; KEY_BUF_LEN],
    len: usize,
}

impl Key {
    /// Turn a password into a key the way each version does.
    ///
    /// `2b` and `2y` cap the password at 72 bytes. `2a` truncates the key length
    /// to 8 bits, a length of 0 reads the first byte over and over.
    pub(crate) fn new(password: &[u8], version: Version) -> Result<Self> {
        if password.contains(&0) {
            return Err(Error::PasswordContainsNul);
        }

        let mut buf = [0u8; KEY_BUF_LEN];
        let copied = password.len().min(KEY_BUF_LEN);
        buf[..copied].copy_from_slice(&password[..copied]);

        let len = match version {
            Version::TwoA => ((password.len() + 1) & 0xff).max(1),
            Version::TwoB | Version::TwoY => password.len().min(MAX_PASSWORD_LEN) + 1,
        };

        Ok(Self {
            buf,
            // only the first 72 bytes are ever consumed by a longer key
            len: len.min(KEY_BUF_LEN),
        })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

/// The expensive key setup: one salted expansion, then `2^cost` rounds of alternating key and salt expansions
pub fn eks_blowfish_setup(key: &[u8], salt: &Salt, cost: Cost) -> Blowfish {
    let mut state = Blowfish::init_state();
    state.expand_state(salt.as_bytes(), key);
    for _ in 0..cost.rounds() {
        state.expand0_state(key);
        state.expand0_state(salt.as_bytes());
    }
    state
}

/// Compute the full 24 byte bcrypt ciphertext for a password under a setting
pub fn bcrypt_raw(password: &[u8], setting: &Setting) -> Result<[u8; 24]> {
    let key = Key::new(password, setting.version)?;
    let state = eks_blowfish_setup(key.as_bytes(), &setting.salt, setting.cost);

    let mut cdata = [0u32; MAGIC_WORDS];
    for (word, chunk) in cdata.iter_mut().zip(MAGIC.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    for _ in 0..64 {
        state.encrypt_words(&mut cdata);
    }

    let mut output = [0u8; 24];
    for (chunk, word) in output.chunks_exact_mut(4).zip(cdata.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    cdata.zeroize();

    Ok(output)
}

/// Compute the 23 byte digest that goes into the hash string
pub(crate) fn bcrypt_digest(password: &[u8], setting: &Setting) -> Result<[u8; DIGEST_LEN]> {
    let raw = bcrypt_raw(password, setting)?;
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&raw[..DIGEST_LEN]);
    Ok(digest)
}
