//! Textbook RSA substitution table: each letter's code point raised to the
//! public exponent modulo `n`. Illustrative only; there is no padding and the
//! default modulus 3763 = 53 * 71 is trivially factored.

use crate::cache::ModExpCache;
use crate::config::RsaConfig;
use crate::error::ArithError;
use crate::modpow::mod_pow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LetterRow {
    pub letter: char,
    pub code: u32,
    pub encrypted: u32,
}

/// Encrypt every letter from `config.first` to `config.last` inclusive.
pub fn letter_table(config: &RsaConfig, cache: &mut ModExpCache) -> Result<Vec<LetterRow>, ArithError> {
    (config.first..=config.last)
        .map(|letter| {
            let code = letter as u32;
            let encrypted = mod_pow(code, config.exponent as u64, config.modulus, cache)?;
            Ok(LetterRow {
                letter,
                code,
                encrypted,
            })
        })
        .collect()
}
