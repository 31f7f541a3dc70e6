//! Derivation codes and the size table that frames every primitive.
//!
//! A code's first character selects its hard size (how many characters
//! the code itself occupies). The table then fixes the full encoded size,
//! from which the raw size and pad size follow.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SignifyError};

use super::matter::Matter;

/// Matter derivation codes.
pub mod mtr {
    pub const ED25519_SEED: &str = "A";
    pub const ED25519N: &str = "B";
    pub const X25519: &str = "C";
    pub const ED25519: &str = "D";
    pub const BLAKE3_256: &str = "E";
    pub const BLAKE2B_256: &str = "F";
    pub const BLAKE2S_256: &str = "G";
    pub const SHA3_256: &str = "H";
    pub const SHA2_256: &str = "I";
    pub const SHORT: &str = "M";
    pub const X25519_CIPHER_SEED: &str = "P";
    pub const SALT_128: &str = "0A";
    pub const ED25519_SIG: &str = "0B";
    pub const BLAKE3_512: &str = "0D";
    pub const BLAKE2B_512: &str = "0E";
    pub const SHA3_512: &str = "0F";
    pub const SHA2_512: &str = "0G";
    pub const LONG: &str = "0H";
    pub const X25519_CIPHER_SALT: &str = "1AAH";
}

/// Hard size, soft size and full size of a code, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sizage {
    pub hs: usize,
    pub ss: usize,
    pub fs: usize,
}

impl Sizage {
    /// Code size: hard plus soft.
    pub fn cs(&self) -> usize {
        self.hs + self.ss
    }

    /// Raw material size in bytes.
    pub fn raw_size(&self) -> usize {
        (self.fs - self.cs()) * 3 / 4
    }

    /// Number of zero bytes prepended to the raw material before encoding.
    pub fn pad_size(&self) -> usize {
        (3 - self.raw_size() % 3) % 3
    }
}

/// Hard size selected by the first character of a code.
pub fn hard_size(first: char) -> Option<usize> {
    match first {
        'A'..='Z' | 'a'..='z' => Some(1),
        '0' | '4' | '5' | '6' => Some(2),
        '1' | '2' | '3' | '7' | '8' | '9' => Some(4),
        _ => None,
    }
}

const TABLE: &[(&str, Sizage)] = &[
    (mtr::ED25519_SEED, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::ED25519N, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::X25519, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::ED25519, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::BLAKE3_256, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::BLAKE2B_256, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::BLAKE2S_256, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::SHA3_256, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::SHA2_256, Sizage { hs: 1, ss: 0, fs: 44 }),
    (mtr::SHORT, Sizage { hs: 1, ss: 0, fs: 4 }),
    (mtr::X25519_CIPHER_SEED, Sizage { hs: 1, ss: 0, fs: 124 }),
    (mtr::SALT_128, Sizage { hs: 2, ss: 0, fs: 24 }),
    (mtr::ED25519_SIG, Sizage { hs: 2, ss: 0, fs: 88 }),
    (mtr::BLAKE3_512, Sizage { hs: 2, ss: 0, fs: 88 }),
    (mtr::BLAKE2B_512, Sizage { hs: 2, ss: 0, fs: 88 }),
    (mtr::SHA3_512, Sizage { hs: 2, ss: 0, fs: 88 }),
    (mtr::SHA2_512, Sizage { hs: 2, ss: 0, fs: 88 }),
    (mtr::LONG, Sizage { hs: 2, ss: 0, fs: 8 }),
    (mtr::X25519_CIPHER_SALT, Sizage { hs: 4, ss: 0, fs: 100 }),
];

/// Immutable lookup from derivation code to its sizes.
///
/// Built once and shared by cloning; every component that encodes or
/// decodes material is handed a `Codec` rather than reaching for a global.
#[derive(Debug, Clone)]
pub struct Codec {
    sizes: Arc<HashMap<&'static str, Sizage>>,
}

impl Codec {
    /// The standard table of fixed-size codes.
    pub fn standard() -> Self {
        Self::from_entries(TABLE)
    }

    fn from_entries(entries: &[(&'static str, Sizage)]) -> Self {
        let sizes = entries.iter().copied().collect();
        Self {
            sizes: Arc::new(sizes),
        }
    }

    /// Look up a code, returning the interned code and its sizes.
    pub fn lookup(&self, code: &str) -> Result<(&'static str, Sizage)> {
        self.sizes
            .get_key_value(code)
            .map(|(c, s)| (*c, *s))
            .ok_or_else(|| SignifyError::Material(format!("unknown derivation code {code:?}")))
    }

    /// Build material from a code and raw bytes.
    ///
    /// Fails unless `raw` has exactly the length the code dictates.
    pub fn material(&self, code: &str, raw: impl Into<Vec<u8>>) -> Result<Matter> {
        let (code, sizage) = self.lookup(code)?;
        Matter::from_parts(code, sizage, raw.into())
    }

    /// Encode material as qb64 text.
    pub fn encode(&self, matter: &Matter) -> String {
        matter.qb64()
    }

    /// Decode a complete qb64 string.
    pub fn decode(&self, qb64: &str) -> Result<Matter> {
        let (matter, consumed) = self.decode_prefix(qb64)?;
        if consumed != qb64.len() {
            return Err(SignifyError::Material(format!(
                "trailing characters after {} code: expected {consumed} characters, got {}",
                matter.code(),
                qb64.len()
            )));
        }
        Ok(matter)
    }

    /// Decode the primitive at the start of `text`, returning it and the
    /// number of characters consumed.
    pub fn decode_prefix(&self, text: &str) -> Result<(Matter, usize)> {
        let first = text
            .chars()
            .next()
            .ok_or_else(|| SignifyError::Material("empty material".into()))?;
        let hs = hard_size(first)
            .ok_or_else(|| SignifyError::Material(format!("invalid code selector {first:?}")))?;
        let hard = text
            .get(..hs)
            .ok_or_else(|| SignifyError::Material("material shorter than its code".into()))?;
        let (code, sizage) = self.lookup(hard)?;
        let body = text.get(sizage.cs()..sizage.fs).ok_or_else(|| {
            SignifyError::Material(format!(
                "{code} material needs {} characters, got {}",
                sizage.fs,
                text.len()
            ))
        })?;
        let matter = Matter::from_body(code, sizage, body)?;
        Ok((matter, sizage.fs))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::standard()
    }
}
