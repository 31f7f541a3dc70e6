//! Indexed signatures.
//!
//! An indexed signature carries the position of the signing key in the
//! event's key list, so a verifier can match signatures to keys without
//! trying every pair.

use std::fmt;

use crate::error::{Result, SignifyError};

use super::b64;

/// Ed25519 signature whose index is valid in both current and prior lists.
pub const ED25519_SIG: &str = "A";
/// Ed25519 signature whose index is valid in the current list only.
pub const ED25519_CRT_SIG: &str = "B";
/// Big-index variants (two-character index plus two-character other-index).
pub const ED25519_BIG_SIG: &str = "2A";
pub const ED25519_BIG_CRT_SIG: &str = "2B";

const SIG_SIZE: usize = 64;
const SMALL_INDEX_LIMIT: u32 = 64;
const BIG_INDEX_LIMIT: u32 = 64 * 64;

/// An Ed25519 signature bound to a key index.
#[derive(Clone, PartialEq, Eq)]
pub struct IndexedSignature {
    index: u32,
    current_only: bool,
    raw: [u8; SIG_SIZE],
}

impl IndexedSignature {
    pub fn new(raw: [u8; SIG_SIZE], index: u32, current_only: bool) -> Result<Self> {
        if index >= BIG_INDEX_LIMIT {
            return Err(SignifyError::Material(format!(
                "signature index {index} out of range"
            )));
        }
        Ok(Self {
            index,
            current_only,
            raw,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn current_only(&self) -> bool {
        self.current_only
    }

    pub fn raw(&self) -> &[u8; SIG_SIZE] {
        &self.raw
    }

    fn code(&self) -> &'static str {
        match (self.index < SMALL_INDEX_LIMIT, self.current_only) {
            (true, false) => ED25519_SIG,
            (true, true) => ED25519_CRT_SIG,
            (false, false) => ED25519_BIG_SIG,
            (false, true) => ED25519_BIG_CRT_SIG,
        }
    }

    /// Fully qualified Base64 text.
    pub fn qb64(&self) -> Result<String> {
        let code = self.code();
        let soft = if self.index < SMALL_INDEX_LIMIT {
            b64::int_to_b64(u64::from(self.index), 1)?
        } else {
            let ondex = if self.current_only { 0 } else { self.index };
            format!(
                "{}{}",
                b64::int_to_b64(u64::from(self.index), 2)?,
                b64::int_to_b64(u64::from(ondex), 2)?
            )
        };
        let mut padded = vec![0u8; 2];
        padded.extend_from_slice(&self.raw);
        Ok(format!("{code}{soft}{}", &b64::encode(&padded)[2..]))
    }

    /// Parse an indexed signature from its qb64 text.
    pub fn from_qb64(text: &str) -> Result<Self> {
        let (cs, current_only, big) = match text.get(..1) {
            Some(ED25519_SIG) => (2, false, false),
            Some(ED25519_CRT_SIG) => (2, true, false),
            Some("2") => match text.get(..2) {
                Some(ED25519_BIG_SIG) => (6, false, true),
                Some(ED25519_BIG_CRT_SIG) => (6, true, true),
                _ => return Err(SignifyError::Material(format!("unknown indexed code in {text:?}"))),
            },
            _ => return Err(SignifyError::Material(format!("unknown indexed code in {text:?}"))),
        };
        let fs = if big { 92 } else { 88 };
        if !text.is_ascii() {
            return Err(SignifyError::Material(format!(
                "indexed signature is not Base64 text: {text:?}"
            )));
        }
        if text.len() != fs {
            return Err(SignifyError::Material(format!(
                "indexed signature must be {fs} characters, got {}",
                text.len()
            )));
        }
        let index_text = if big { &text[2..4] } else { &text[1..2] };
        let index = b64::b64_to_int(index_text)? as u32;

        let paw = b64::decode(&format!("AA{}", &text[cs..]))?;
        if paw[..2].iter().any(|b| *b != 0) {
            return Err(SignifyError::Material("non-zero pad bits in signature".into()));
        }
        let raw: [u8; SIG_SIZE] = paw[2..]
            .try_into()
            .map_err(|_| SignifyError::Material("signature must be 64 bytes".into()))?;
        Self::new(raw, index, current_only)
    }
}

impl fmt::Debug for IndexedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedSignature")
            .field("index", &self.index)
            .field("current_only", &self.current_only)
            .finish()
    }
}
