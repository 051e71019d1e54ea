#![doc = include_str!("../README.md")]
#![cfg_attr(
    all(not(test), not(feature = "std"), not(target_arch = "wasm32")),
    no_std
)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

/// Re-export sha2
pub use sha2;

/// Error types
pub mod error;

/// Blowfish cipher core and Eksblowfish key expansion
pub mod blowfish;

/// Settings, salts, costs and the radix-64 hash format
pub mod format;

/// The bcrypt (Eksblowfish) password hash
pub mod eks;

/// OpenBSD bcrypt_pbkdf key derivation
pub mod pbkdf;

/// Algorithmic Self-Test (CAST)
pub mod self_test;

/// Compat APIs
#[cfg(any(feature = "std", target_arch = "wasm32"))]
pub mod compat;

use subtle::ConstantTimeEq;

pub use crate::{
    blowfish::Blowfish,
    error::{Error, Result},
    format::{Cost, HASH_LEN, HashParts, SETTING_LEN, Salt, Setting, Version},
    pbkdf::bcrypt_pbkdf,
};

/// Hash a password under a parsed setting
pub fn hash_with_setting(password: &[u8], setting: &Setting) -> Result<HashParts> {
    let digest = eks::bcrypt_digest(password, setting)?;
    Ok(HashParts {
        setting: *setting,
        digest,
    })
}

/// Hash a password with a `$2b$` setting built from a cost and salt
pub fn hash_with_salt(password: &[u8], cost: Cost, salt: Salt) -> Result<HashParts> {
    hash_with_setting(password, &Setting::new(cost, salt))
}

/// Hash a password under an encoded setting into an encoded hash
#[cfg(feature = "alloc")]
pub fn hash_to_string(password: &[u8], setting: &str) -> Result<alloc::string::String> {
    let setting = Setting::parse(setting.as_bytes())?;
    hash_with_setting(password, &setting).map(Into::into)
}

/// Hash a password with a fresh random salt
#[cfg(feature = "std")]
pub fn hash(password: &[u8], cost: Cost) -> Result<HashParts> {
    hash_with_salt(password, cost, Salt::random())
}

/// A `$2b$` setting with a fresh random salt
#[cfg(feature = "std")]
pub fn gen_setting(cost: Cost) -> Setting {
    Setting::new(cost, Salt::random())
}

/// Check a password against an encoded hash.
///
/// The comparison of the re-encoded hash is constant time. A malformed hash is an error, a wrong password is `Ok(false)`.
pub fn verify(password: &[u8], hash: &str) -> Result<bool> {
    let expected = HashParts::parse(hash.as_bytes())?;
    let actual = hash_with_setting(password, &expected.setting)?.encode();
    Ok(actual[..].ct_eq(hash.as_bytes()).into())
}

/// Pick a cost that takes roughly 60 to 120 ms on this machine.
///
/// Times a cost 8 hash, then doubles up to cost 16 while too fast and halves down to cost 6 while too slow.
#[cfg(feature = "std")]
pub fn auto_cost() -> Cost {
    const PROBE: u32 = 8;

    let probe = Setting::new(Cost::new(PROBE).unwrap_or(Cost::MIN), Salt::random());

    let start = std::time::Instant::now();
    let _ = hash_with_setting(b"testpassword", &probe);
    let mut duration = start.elapsed().as_micros();

    let mut cost = PROBE;
    while cost < 16 && duration <= 60_000 {
        cost += 1;
        duration *= 2;
    }
    while cost > 6 && duration > 120_000 {
        cost -= 1;
        duration /= 2;
    }

    Cost::new(cost).unwrap_or(Cost::DEFAULT)
}
