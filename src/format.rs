use core::{fmt, str::FromStr};

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use crate::error::{Error, Result};

/// Radix-64 with the bcrypt alphabet, unpadded, ignoring trailing bits on decode
pub const BCRYPT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Raw salt length in bytes
pub const SALT_LEN: usize = 16;

/// Encoded salt length in characters
pub const ENCODED_SALT_LEN: usize = 22;

/// Raw digest length in bytes (the last ciphertext byte is dropped)
pub const DIGEST_LEN: usize = 23;

/// Encoded digest length in characters
pub const ENCODED_DIGEST_LEN: usize = 31;

/// Length of the `$2b$NN$` prefix
pub const PREFIX_LEN: usize = 7;

/// Length of an encoded setting (prefix and salt)
pub const SETTING_LEN: usize = PREFIX_LEN + ENCODED_SALT_LEN;

/// Length of an encoded hash
pub const HASH_LEN: usize = SETTING_LEN + ENCODED_DIGEST_LEN;

/// The scheme minor version, which only changes how the password becomes a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// `$2a$`: the key length wraps around at 256 bytes
    TwoA,
    /// `$2b$`: the password is capped at 72 bytes
    #[default]
    TwoB,
    /// `$2y$`: identical to `$2b$`
    TwoY,
}

impl Version {
    /// The minor version character
    pub const fn minor(self) -> u8 {
        match self {
            Version::TwoA => b'a',
            Version::TwoB => b'b',
            Version::TwoY => b'y',
        }
    }

    /// Parse a minor version character
    pub const fn from_minor(minor: u8) -> Result<Self> {
        match minor {
            b'a' => Ok(Version::TwoA),
            b'b' => Ok(Version::TwoB),
            b'y' => Ok(Version::TwoY),
            _ => Err(Error::UnsupportedVersion),
        }
    }
}

/// A validated cost factor (log2 of the expansion rounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(u8);

impl Cost {
    /// Smallest accepted cost
    pub const MIN: Cost = Cost(4);
    /// Largest accepted cost
    pub const MAX: Cost = Cost(31);
    /// Cost used when none is given
    pub const DEFAULT: Cost = Cost(12);

    /// Validate a cost factor
    pub const fn new(cost: u32) -> Result<Self> {
        if cost < Self::MIN.0 as u32 || cost > Self::MAX.0 as u32 {
            return Err(Error::InvalidCost(cost));
        }
        Ok(Cost(cost as u8))
    }

    /// The cost factor
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Number of expansion rounds, `2^cost`
    pub const fn rounds(self) -> u32 {
        1 << self.0
    }
}

impl Default for Cost {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Cost {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for Cost {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let cost: u32 = s.parse().map_err(|_| Error::MalformedCost)?;
        Self::new(cost)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// A 16 byte salt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Wrap raw salt bytes
    pub const fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw salt bytes
    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    /// Generate a random salt from the operating system
    #[cfg(feature = "std")]
    pub fn random() -> Self {
        use rand::RngCore;

        let mut bytes = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Decode the first 22 radix-64 characters of `encoded`
    pub fn decode(encoded: &[u8]) -> Result<Self> {
        let encoded = encoded
            .get(..ENCODED_SALT_LEN)
            .ok_or(Error::InvalidSalt)?;
        let mut buf = [0u8; 18];
        match BCRYPT_BASE64.decode_slice(encoded, &mut buf) {
            Ok(SALT_LEN) => {}
            _ => return Err(Error::InvalidSalt),
        }
        let mut bytes = [0u8; SALT_LEN];
        bytes.copy_from_slice(&buf[..SALT_LEN]);
        Ok(Self(bytes))
    }

    /// Encode as 22 radix-64 characters
    pub fn encode(&self) -> [u8; ENCODED_SALT_LEN] {
        let mut out = [0u8; ENCODED_SALT_LEN];
        encode_exact(&self.0, &mut out);
        out
    }
}

#[inline(always)]
fn encode_exact(input: &[u8], output: &mut [u8]) {
    let written = BCRYPT_BASE64.encode_slice(input, output);
    debug_assert_eq!(written.ok(), Some(output.len()));
}

/// Version, cost and salt: everything needed to hash a password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Setting {
    /// Scheme version
    pub version: Version,
    /// Cost factor
    pub cost: Cost,
    /// Salt
    pub salt: Salt,
}

impl Setting {
    /// Create a `$2b$` setting
    pub const fn new(cost: Cost, salt: Salt) -> Self {
        Self {
            version: Version::TwoB,
            cost,
            salt,
        }
    }

    /// Parse `$2?$NN$` followed by at least 22 salt characters.
    ///
    /// Anything after the salt is ignored, so a complete hash is also a valid setting.
    pub fn parse(setting: &[u8]) -> Result<Self> {
        let prefix = setting.get(..PREFIX_LEN).ok_or(Error::InvalidSetting)?;
        if prefix[0] != b'$' || prefix[1] != b'2' {
            return Err(Error::InvalidSetting);
        }
        if prefix[2] == b'$' {
            // the original "$2$" scheme
            return Err(Error::UnsupportedVersion);
        }
        let version = Version::from_minor(prefix[2])?;
        if prefix[3] != b'$' || prefix[6] != b'$' {
            return Err(Error::InvalidSetting);
        }
        if !prefix[4].is_ascii_digit() || !prefix[5].is_ascii_digit() {
            return Err(Error::InvalidSetting);
        }
        let cost = Cost::new(((prefix[4] - b'0') * 10 + (prefix[5] - b'0')) as u32)?;
        let salt = Salt::decode(&setting[PREFIX_LEN..])?;

        Ok(Self {
            version,
            cost,
            salt,
        })
    }

    /// Encode as `$2?$NN$` and 22 salt characters
    pub fn encode(&self) -> [u8; SETTING_LEN] {
        let mut out = [0u8; SETTING_LEN];
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut [u8]) {
        let cost = self.cost.get();
        out[..PREFIX_LEN].copy_from_slice(&[
            b'$',
            b'2',
            self.version.minor(),
            b'$',
            b'0' + cost / 10,
            b'0' + cost % 10,
            b'$',
        ]);
        out[PREFIX_LEN..SETTING_LEN].copy_from_slice(&self.salt.encode());
    }
}

impl FromStr for Setting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.encode();
        // the encoding is always ASCII
        f.write_str(core::str::from_utf8(&encoded).map_err(|_| fmt::Error)?)
    }
}

/// A complete bcrypt hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashParts {
    /// The setting the hash was computed with
    pub setting: Setting,
    /// The truncated ciphertext
    pub digest: [u8; DIGEST_LEN],
}

impl HashParts {
    /// Parse a hash of exactly 60 characters
    pub fn parse(hash: &[u8]) -> Result<Self> {
        if hash.len() != HASH_LEN {
            return Err(Error::InvalidHash);
        }
        let setting = Setting::parse(hash)?;

        let mut buf = [0u8; 24];
        match BCRYPT_BASE64.decode_slice(&hash[SETTING_LEN..], &mut buf) {
            Ok(DIGEST_LEN) => {}
            _ => return Err(Error::InvalidHash),
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&buf[..DIGEST_LEN]);

        Ok(Self { setting, digest })
    }

    /// Encode as the 60 character hash string
    pub fn encode(&self) -> [u8; HASH_LEN] {
        let mut out = [0u8; HASH_LEN];
        self.setting.encode_into(&mut out);
        encode_exact(&self.digest, &mut out[SETTING_LEN..]);
        out
    }

    /// Relabel with another version, the versions only diverge for passwords of 255 bytes or more
    pub fn with_version(mut self, version: Version) -> Self {
        self.setting.version = version;
        self
    }
}

impl FromStr for HashParts {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Display for HashParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.encode();
        f.write_str(core::str::from_utf8(&encoded).map_err(|_| fmt::Error)?)
    }
}

#[cfg(feature = "alloc")]
impl From<Setting> for alloc::string::String {
    fn from(setting: Setting) -> Self {
        setting.encode().iter().map(|&b| char::from(b)).collect()
    }
}

#[cfg(feature = "alloc")]
impl From<HashParts> for alloc::string::String {
    fn from(parts: HashParts) -> Self {
        parts.encode().iter().map(|&b| char::from(b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTING: &str = "$2b$16$cbo7LZ.wxgW4yxAA5Vqlv.";
    const HASH: &str = "$2b$16$cbo7LZ.wxgW4yxAA5Vqlv.fwGuLEa9PGOV.Fw8FPup2nicB6mHa0q";

    #[test]
    fn test_setting_round_trip() {
        let setting: Setting = SETTING.parse().unwrap();
        assert_eq!(setting.version, Version::TwoB);
        assert_eq!(setting.cost.get(), 16);
        assert_eq!(setting.cost.rounds(), 65536);
        assert_eq!(&setting.encode(), SETTING.as_bytes());
        assert_eq!(format!("{}", setting), SETTING);
    }

    #[test]
    fn test_full_hash_is_a_setting() {
        assert_eq!(
            Setting::parse(HASH.as_bytes()),
            Setting::parse(SETTING.as_bytes())
        );
    }

    #[test]
    fn test_hash_round_trip() {
        let parts: HashParts = HASH.parse().unwrap();
        assert_eq!(&parts.encode(), HASH.as_bytes());
        assert_eq!(parts.to_string(), HASH);
        assert_eq!(
            parts.with_version(Version::TwoY).to_string(),
            HASH.replacen("$2b$", "$2y$", 1)
        );
    }

    #[test]
    fn test_malformed_settings() {
        assert_eq!(Setting::parse(b""), Err(Error::InvalidSetting));
        assert_eq!(Setting::parse(b"$2b$16$"), Err(Error::InvalidSalt));
        assert_eq!(
            Setting::parse(b"$2b$16$cbo7LZ.wxgW4yxAA5Vql"),
            Err(Error::InvalidSalt)
        );
        assert_eq!(
            Setting::parse(b"$2b$16$cbo7LZ.wxgW4yxAA5Vql!."),
            Err(Error::InvalidSalt)
        );
        assert_eq!(
            Setting::parse(b"$1$16$cbo7LZ.wxgW4yxAA5Vqlv."),
            Err(Error::InvalidSetting)
        );
        assert_eq!(
            Setting::parse(b"$2$16$cbo7LZ.wxgW4yxAA5Vqlv."),
            Err(Error::UnsupportedVersion)
        );
        assert_eq!(
            Setting::parse(b"$2x$16$cbo7LZ.wxgW4yxAA5Vqlv."),
            Err(Error::UnsupportedVersion)
        );
        assert_eq!(
            Setting::parse(b"$2b$6$$cbo7LZ.wxgW4yxAA5Vqlv."),
            Err(Error::InvalidSetting)
        );
        assert_eq!(
            Setting::parse(b"$2b$03$cbo7LZ.wxgW4yxAA5Vqlv."),
            Err(Error::InvalidCost(3))
        );
        assert_eq!(
            Setting::parse(b"$2b$32$cbo7LZ.wxgW4yxAA5Vqlv."),
            Err(Error::InvalidCost(32))
        );
    }

    #[test]
    fn test_malformed_hashes() {
        assert_eq!(HashParts::parse(SETTING.as_bytes()), Err(Error::InvalidHash));
        assert_eq!(
            HashParts::parse(&HASH.as_bytes()[..HASH_LEN - 1]),
            Err(Error::InvalidHash)
        );
        let mut bad = *b"$2b$16$cbo7LZ.wxgW4yxAA5Vqlv.fwGuLEa9PGOV.Fw8FPup2nicB6mHa0q";
        bad[HASH_LEN - 1] = b'=';
        assert_eq!(HashParts::parse(&bad), Err(Error::InvalidHash));
    }

    #[test]
    fn test_cost_bounds() {
        assert_eq!(Cost::new(3), Err(Error::InvalidCost(3)));
        assert_eq!(Cost::new(4), Ok(Cost::MIN));
        assert_eq!(Cost::new(31).map(Cost::rounds), Ok(1 << 31));
        assert_eq!(Cost::new(32), Err(Error::InvalidCost(32)));
        assert_eq!("05".parse::<Cost>(), Cost::new(5));
        assert_eq!(Cost::new(5).unwrap().to_string(), "05");
        assert_eq!("32".parse::<Cost>(), Err(Error::InvalidCost(32)));
        assert_eq!("twelve".parse::<Cost>(), Err(Error::MalformedCost));
        assert_eq!("".parse::<Cost>(), Err(Error::MalformedCost));
        assert_eq!("99999999999".parse::<Cost>(), Err(Error::MalformedCost));
    }

    #[test]
    fn test_salt_trailing_bits_are_ignored() {
        let canonical = Salt::decode(b"cbo7LZ.wxgW4yxAA5Vqlv.").unwrap();
        let noisy = Salt::decode(b"cbo7LZ.wxgW4yxAA5Vqlv/").unwrap();
        assert_eq!(canonical, noisy);
        assert_eq!(&noisy.encode(), b"cbo7LZ.wxgW4yxAA5Vqlv.");
    }

    #[test]
    fn test_salt_encoding_matches_rustcrypto() {
        let salt = Salt::from_bytes(*b"abcdefghijklmnop");
        let theirs = bcrypt::hash_with_salt("x", 4, *salt.as_bytes())
            .unwrap()
            .format_for_version(bcrypt::Version::TwoB);
        assert_eq!(&theirs.as_bytes()[PREFIX_LEN..SETTING_LEN], &salt.encode());
    }
}
