use crate::Setting;

/// Reference case at cost 16 with a `$2b$` setting
pub struct CastCost16;

impl Case for CastCost16 {
    const PASSWORD: &'static [u8] = b"C'est bon, la vie!";
    const SETTING: &'static str = "$2b$16$cbo7LZ.wxgW4yxAA5Vqlv.";
    const KNOWN_ANSWER: &'static str =
        "$2b$16$cbo7LZ.wxgW4yxAA5Vqlv.fwGuLEa9PGOV.Fw8FPup2nicB6mHa0q";
}

/// crypt_blowfish case for a short password at cost 5
pub struct CastCost5Short;

impl Case for CastCost5Short {
    const PASSWORD: &'static [u8] = b"U*U";
    const SETTING: &'static str = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.";
    const KNOWN_ANSWER: &'static str =
        "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW";
}

/// crypt_blowfish case for the empty password at cost 5
pub struct CastCost5Empty;

impl Case for CastCost5Empty {
    const PASSWORD: &'static [u8] = b"";
    const SETTING: &'static str = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.";
    const KNOWN_ANSWER: &'static str =
        "$2a$05$CCCCCCCCCCCCCCCCCCCCC.7uG0VCzI2bS7j6ymqJi9CdcdxiRTWNy";
}

/// crypt_blowfish case for a password longer than 72 bytes at cost 5
pub struct CastCost5Truncated;

impl Case for CastCost5Truncated {
    const PASSWORD: &'static [u8] =
        b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789chars after 72 are ignored";
    const SETTING: &'static str = "$2a$05$abcdefghijklmnopqrstuu";
    const KNOWN_ANSWER: &'static str =
        "$2a$05$abcdefghijklmnopqrstuu5s2v8.iXieOjg/.AySBTTZIIVFJeBui";
}

/// A known answer test case
pub trait Case {
    /// The password
    const PASSWORD: &'static [u8];
    /// The setting (version, cost and salt)
    const SETTING: &'static str;
    /// The known answer
    const KNOWN_ANSWER: &'static str;

    /// Test the algorithm implementation, panics on failure
    fn algorithm_self_test() {
        let setting = Setting::parse(Self::SETTING.as_bytes()).expect("invalid setting");

        let parts = crate::hash_with_setting(Self::PASSWORD, &setting).expect("hashing failed");
        assert_eq!(&parts.encode()[..], Self::KNOWN_ANSWER.as_bytes());

        // C API test, also checks determinism
        #[cfg(feature = "std")]
        {
            use crate::HASH_LEN;

            const CANARY: u8 = 0xa5;

            let password = std::ffi::CString::new(Self::PASSWORD).expect("NUL in password");
            let setting = std::ffi::CString::new(Self::SETTING).expect("NUL in setting");
            let mut buffer = [CANARY; HASH_LEN + 1 + 16];

            let rc = unsafe {
                crate::compat::bcrypt_c(
                    password.as_ptr(),
                    setting.as_ptr(),
                    buffer.as_mut_ptr().cast(),
                    HASH_LEN + 1,
                )
            };
            assert_eq!(rc, 0);
            assert_eq!(&buffer[..HASH_LEN], Self::KNOWN_ANSWER.as_bytes());
            assert_eq!(buffer[HASH_LEN], 0);
            assert!(
                buffer[HASH_LEN + 1..].iter().all(|&b| b == CANARY),
                "wrote past the declared capacity"
            );
        }

        // check output is not stuck
        assert_eq!(
            crate::verify(b"not a password", Self::KNOWN_ANSWER),
            Ok(false),
            "stuck output"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_cost_5_short_algorithm_self_test() {
        CastCost5Short::algorithm_self_test();
    }

    #[test]
    fn test_cast_cost_5_empty_algorithm_self_test() {
        CastCost5Empty::algorithm_self_test();
    }

    #[test]
    fn test_cast_cost_5_truncated_algorithm_self_test() {
        CastCost5Truncated::algorithm_self_test();
    }

    #[test]
    fn test_cast_cost_16_algorithm_self_test() {
        CastCost16::algorithm_self_test();
    }
}
