use zeroize::Zeroize;

use crate::error::{Error, Result};

include!(concat!(env!("OUT_DIR"), "/pi_words.rs"));

/// Blowfish block size in bytes
pub const BLOCK_SIZE: usize = 8;

/// Shortest standard Blowfish key in bytes
pub const MIN_KEY_LEN: usize = 4;

/// Longest standard Blowfish key in bytes
pub const MAX_KEY_LEN: usize = 56;

/// Cyclic big-endian word reader over a key or salt
struct WordStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WordStream<'a> {
    #[inline(always)]
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    // an empty stream yields zero words
    #[inline(always)]
    fn next_word(&mut self) -> u32 {
        if self.data.is_empty() {
            return 0;
        }

        let mut word = 0u32;
        for _ in 0..4 {
            if self.pos >= self.data.len() {
                self.pos = 0;
            }
            word = (word << 8) | self.data[self.pos] as u32;
            self.pos += 1;
        }
        word
    }
}

/// Blowfish cipher state, including the Eksblowfish key expansion primitives used by bcrypt.
///
/// The state is wiped on drop.
#[derive(Clone)]
pub struct Blowfish {
    p: [u32; 18],
    s: [[u32; 256]; 4],
}

impl Blowfish {
    /// The initial state derived from the digits of pi, before any key is mixed in
    pub const fn init_state() -> Self {
        Self {
            p: INIT_P,
            s: INIT_S,
        }
    }

    /// Create a cipher with the standard Blowfish key schedule
    pub fn new(key: &[u8]) -> Result<Self> {
        if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&key.len()) {
            return Err(Error::InvalidKeyLength(key.len()));
        }

        let mut state = Self::init_state();
        state.expand0_state(key);
        Ok(state)
    }

    #[inline(always)]
    fn f(&self, x: u32) -> u32 {
        let [a, b, c, d] = x.to_be_bytes();
        (self.s[0][a as usize].wrapping_add(self.s[1][b as usize]) ^ self.s[2][c as usize])
            .wrapping_add(self.s[3][d as usize])
    }

    /// Encrypt one block given as two big-endian halves
    #[inline(always)]
    pub fn encrypt(&self, l: u32, r: u32) -> (u32, u32) {
        let mut l = l ^ self.p[0];
        let mut r = r;
        for i in (1..17).step_by(2) {
            r ^= self.f(l) ^ self.p[i];
            l ^= self.f(r) ^ self.p[i + 1];
        }
        (r ^ self.p[17], l)
    }

    /// Decrypt one block given as two big-endian halves
    #[inline(always)]
    pub fn decrypt(&self, l: u32, r: u32) -> (u32, u32) {
        let mut l = l ^ self.p[17];
        let mut r = r;
        for i in (2..17).rev().step_by(2) {
            r ^= self.f(l) ^ self.p[i];
            l ^= self.f(r) ^ self.p[i - 1];
        }
        (r ^ self.p[0], l)
    }

    /// Mix `key` into P, then re-key the whole state while folding in `data` (the salt).
    ///
    /// The data stream position carries over from the P-array into the S-boxes.
    pub fn expand_state(&mut self, data: &[u8], key: &[u8]) {
        let mut key_stream = WordStream::new(key);
        self.p.iter_mut().for_each(|p| *p ^= key_stream.next_word());

        let mut data_stream = WordStream::new(data);
        let (mut l, mut r) = (0u32, 0u32);

        for i in (0..18).step_by(2) {
            l ^= data_stream.next_word();
            r ^= data_stream.next_word();
            (l, r) = self.encrypt(l, r);
            self.p[i] = l;
            self.p[i + 1] = r;
        }

        for sbox in 0..4 {
            for i in (0..256).step_by(2) {
                l ^= data_stream.next_word();
                r ^= data_stream.next_word();
                (l, r) = self.encrypt(l, r);
                self.s[sbox][i] = l;
                self.s[sbox][i + 1] = r;
            }
        }
    }

    /// Mix `key` into P, then re-key the whole state from a zero block.
    pub fn expand0_state(&mut self, key: &[u8]) {
        let mut key_stream = WordStream::new(key);
        self.p.iter_mut().for_each(|p| *p ^= key_stream.next_word());

        let (mut l, mut r) = (0u32, 0u32);

        for i in (0..18).step_by(2) {
            (l, r) = self.encrypt(l, r);
            self.p[i] = l;
            self.p[i + 1] = r;
        }

        for sbox in 0..4 {
            for i in (0..256).step_by(2) {
                (l, r) = self.encrypt(l, r);
                self.s[sbox][i] = l;
                self.s[sbox][i + 1] = r;
            }
        }
    }

    /// Encrypt consecutive word pairs in place, a trailing odd word is left untouched
    #[inline(always)]
    pub fn encrypt_words(&self, data: &mut [u32]) {
        for pair in data.chunks_exact_mut(2) {
            (pair[0], pair[1]) = self.encrypt(pair[0], pair[1]);
        }
    }

    /// Encrypt whole 8-byte blocks in ECB mode
    pub fn encrypt_ecb(&self, data: &mut [u8]) -> Result<()> {
        check_aligned(data)?;
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let (l, r) = load_block(block);
            let (l, r) = self.encrypt(l, r);
            store_block(block, l, r);
        }
        Ok(())
    }

    /// Decrypt whole 8-byte blocks in ECB mode
    pub fn decrypt_ecb(&self, data: &mut [u8]) -> Result<()> {
        check_aligned(data)?;
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let (l, r) = load_block(block);
            let (l, r) = self.decrypt(l, r);
            store_block(block, l, r);
        }
        Ok(())
    }

    /// Encrypt whole 8-byte blocks in CBC mode
    pub fn encrypt_cbc(&self, iv: &[u8; BLOCK_SIZE], data: &mut [u8]) -> Result<()> {
        check_aligned(data)?;
        let (mut cl, mut cr) = load_block(iv);
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let (l, r) = load_block(block);
            (cl, cr) = self.encrypt(l ^ cl, r ^ cr);
            store_block(block, cl, cr);
        }
        Ok(())
    }

    /// Decrypt whole 8-byte blocks in CBC mode
    pub fn decrypt_cbc(&self, iv: &[u8; BLOCK_SIZE], data: &mut [u8]) -> Result<()> {
        check_aligned(data)?;
        let (mut cl, mut cr) = load_block(iv);
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let (l, r) = load_block(block);
            let (pl, pr) = self.decrypt(l, r);
            store_block(block, pl ^ cl, pr ^ cr);
            (cl, cr) = (l, r);
        }
        Ok(())
    }
}

impl Drop for Blowfish {
    fn drop(&mut self) {
        self.p.zeroize();
        self.s.zeroize();
    }
}

#[inline(always)]
fn check_aligned(data: &[u8]) -> Result<()> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::UnalignedLength(data.len()));
    }
    Ok(())
}

#[inline(always)]
fn load_block(block: &[u8]) -> (u32, u32) {
    (
        u32::from_be_bytes([block[0], block[1], block[2], block[3]]),
        u32::from_be_bytes([block[4], block[5], block[6], block[7]]),
    )
}

#[inline(always)]
fn store_block(block: &mut [u8], l: u32, r: u32) {
    block[..4].copy_from_slice(&l.to_be_bytes());
    block[4..8].copy_from_slice(&r.to_be_bytes());
}
