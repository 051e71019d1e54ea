use thiserror::Error;

/// Errors produced by hashing, parsing and key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The setting or hash does not start with a `$2?$NN$` prefix.
    #[error("malformed bcrypt setting")]
    InvalidSetting,

    /// The scheme minor version is not one of `a`, `b` or `y`.
    #[error("unsupported bcrypt version")]
    UnsupportedVersion,

    /// The cost factor is outside `4..=31`.
    #[error("invalid cost factor {0}, must be between 4 and 31")]
    InvalidCost(u32),

    /// The cost factor is not a decimal number.
    #[error("cost factor is not a decimal number")]
    MalformedCost,

    /// The salt is missing, short, or not in the bcrypt radix-64 alphabet.
    #[error("invalid salt encoding")]
    InvalidSalt,

    /// The hash is not exactly 60 characters of a valid encoding.
    #[error("invalid hash encoding")]
    InvalidHash,

    /// The password contains a NUL byte, which would silently truncate it.
    #[error("password contains a NUL byte")]
    PasswordContainsNul,

    /// The output buffer cannot hold the result.
    #[error("output buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        got: usize,
    },

    /// A Blowfish key must be 4 to 56 bytes long.
    #[error("invalid Blowfish key length {0}")]
    InvalidKeyLength(usize),

    /// Block mode input must be a multiple of 8 bytes.
    #[error("input length {0} is not a multiple of the block size")]
    UnalignedLength(usize),

    /// bcrypt_pbkdf parameters are out of range.
    #[error("invalid bcrypt_pbkdf parameters")]
    InvalidPbkdfParams,
}

/// Result alias for this crate
pub type Result<T> = core::result::Result<T, Error>;
