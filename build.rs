//! Generates the initial Blowfish state.
//!
//! P and S0..S3 are the first 1042 32-bit words of the fractional part of pi in
//! hexadecimal. They are computed with the Bailey-Borwein-Plouffe digit
//! extraction formula in 96-bit fixed point:
//!
//! frac(16^d * pi) = frac(4 S(1) - 2 S(4) - S(5) - S(6))
//!
//! where S(j) = sum_k 16^(d-k) / (8k + j).

use std::{env, fmt::Write as _, fs, path::PathBuf};

const P_WORDS: usize = 18;
const S_WORDS: usize = 256;
const WORDS: usize = P_WORDS + 4 * S_WORDS;

const FRAC_BITS: u32 = 96;
const MASK: u128 = (1 << FRAC_BITS) - 1;

fn pow16_mod(mut exp: u64, modulus: u64) -> u64 {
    let mut base = 16 % modulus;
    let mut acc = 1 % modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % modulus;
        }
        base = base * base % modulus;
        exp >>= 1;
    }
    acc
}

// frac(sum_k 16^(d-k) / (8k + j)) in FRAC_BITS fixed point
fn series(j: u64, d: u64) -> u128 {
    let mut sum = 0u128;

    for k in 0..=d {
        let denom = 8 * k + j;
        let numer = pow16_mod(d - k, denom) as u128;
        sum = (sum + (numer << FRAC_BITS) / denom as u128) & MASK;
    }

    let mut k = d + 1;
    loop {
        let shift = 4 * (k - d);
        if shift >= FRAC_BITS as u64 {
            break;
        }
        let denom = 8 * k + j;
        sum = (sum + (1u128 << (FRAC_BITS as u64 - shift)) / denom as u128) & MASK;
        k += 1;
    }

    sum
}

fn pi_word(index: usize) -> u32 {
    let d = 8 * index as u64;
    let x = series(1, d)
        .wrapping_mul(4)
        .wrapping_sub(series(4, d).wrapping_mul(2))
        .wrapping_sub(series(5, d))
        .wrapping_sub(series(6, d))
        & MASK;
    (x >> (FRAC_BITS - 32)) as u32
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let words: Vec<u32> = (0..WORDS).map(pi_word).collect();

    let mut out = String::new();
    out.push_str("/// Initial P-array\n");
    writeln!(out, "const INIT_P: [u32; {}] = [", P_WORDS).unwrap();
    for w in &words[..P_WORDS] {
        writeln!(out, "    0x{:08x},", w).unwrap();
    }
    out.push_str("];\n\n/// Initial S-boxes\n");
    writeln!(out, "const INIT_S: [[u32; {}]; 4] = [", S_WORDS).unwrap();
    for sbox in words[P_WORDS..].chunks_exact(S_WORDS) {
        out.push_str("    [\n");
        for row in sbox.chunks(6) {
            out.push_str("       ");
            for w in row {
                write!(out, " 0x{:08x},", w).unwrap();
            }
            out.push('\n');
        }
        out.push_str("    ],\n");
    }
    out.push_str("];\n");

    let path = PathBuf::from(env::var_os("OUT_DIR").unwrap()).join("pi_words.rs");
    fs::write(path, out).unwrap();
}
