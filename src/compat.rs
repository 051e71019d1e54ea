use core::ffi::{CStr, c_char, c_int, c_uint};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{
    HASH_LEN, Setting,
    error::{Error, Result},
    hash_with_setting,
};

/// Hash `password` under `setting` into `output` as a NUL terminated string.
///
/// Returns the length of the hash without the terminator. Nothing is written unless the whole result fits.
pub fn bcrypt(password: &[u8], setting: &[u8], output: &mut [u8]) -> Result<usize> {
    if output.len() < HASH_LEN + 1 {
        return Err(Error::BufferTooSmall {
            needed: HASH_LEN + 1,
            got: output.len(),
        });
    }

    let setting = Setting::parse(setting)?;
    let encoded = hash_with_setting(password, &setting)?.encode();

    output[..HASH_LEN].copy_from_slice(&encoded);
    output[HASH_LEN] = 0;
    Ok(HASH_LEN)
}

#[unsafe(export_name = "bcrypt")]
/// C export for bcrypt: hash a NUL terminated password under a NUL terminated setting.
///
/// Returns 0 on success and -1 on a malformed setting or an output buffer shorter than 61 bytes.
///
/// # Safety
///
/// `password` and `setting` must be valid C strings and `encrypted` must be valid for `encrypted_len` bytes of writes.
pub unsafe extern "C" fn bcrypt_c(
    password: *const c_char,
    setting: *const c_char,
    encrypted: *mut c_char,
    encrypted_len: usize,
) -> c_int {
    if password.is_null() || setting.is_null() || encrypted.is_null() {
        return -1;
    }
    let password = unsafe { CStr::from_ptr(password) };
    let setting = unsafe { CStr::from_ptr(setting) };
    let output = unsafe { core::slice::from_raw_parts_mut(encrypted.cast::<u8>(), encrypted_len) };

    match bcrypt(password.to_bytes(), setting.to_bytes(), output) {
        Ok(_) => 0,
        Err(_) => -1,
    }
}

#[unsafe(export_name = "bcrypt_pbkdf")]
/// C export for bcrypt_pbkdf using the OpenBSD signature.
///
/// # Safety
///
/// `pass`, `salt` and `key` must be valid for their respective lengths.
pub unsafe extern "C" fn bcrypt_pbkdf_c(
    pass: *const c_char,
    passlen: usize,
    salt: *const u8,
    saltlen: usize,
    key: *mut u8,
    keylen: usize,
    rounds: c_uint,
) -> c_int {
    if pass.is_null() || salt.is_null() || key.is_null() {
        return -1;
    }
    let pass = unsafe { core::slice::from_raw_parts(pass.cast::<u8>(), passlen) };
    let salt = unsafe { core::slice::from_raw_parts(salt, saltlen) };
    let key = unsafe { core::slice::from_raw_parts_mut(key, keylen) };

    match crate::pbkdf::bcrypt_pbkdf(pass, salt, rounds, key) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

#[cfg(all(target_arch = "wasm32", feature = "alloc"))]
#[wasm_bindgen(js_name = "bcrypt")]
/// WASM bindings for bcrypt, returns the hash or an error message.
pub fn bcrypt_wasm(password: &[u8], setting: &str) -> alloc::string::String {
    crate::hash_to_string(password, setting).unwrap_or_else(|e| e.to_string())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = "verify")]
/// WASM bindings for verify, a malformed hash never matches.
pub fn verify_wasm(password: &[u8], hash: &str) -> bool {
    crate::verify(password, hash).unwrap_or(false)
}
