//! Matter — raw cryptographic material tagged with its derivation code.

use std::fmt;

use serde::{Serialize, Serializer};
use zeroize::Zeroize;

use crate::error::{Result, SignifyError};

use super::b64;
use super::codes::Sizage;

/// Raw bytes plus the code that says what they are.
///
/// Only constructed through [`Codec`](super::Codec), so the raw length
/// always matches the code. Never mutated after construction.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Matter {
    code: &'static str,
    sizage: Sizage,
    raw: Vec<u8>,
}

impl Matter {
    pub(crate) fn from_parts(code: &'static str, sizage: Sizage, raw: Vec<u8>) -> Result<Self> {
        if raw.len() != sizage.raw_size() {
            return Err(SignifyError::Material(format!(
                "{code} material must be {} bytes, got {}",
                sizage.raw_size(),
                raw.len()
            )));
        }
        Ok(Self { code, sizage, raw })
    }

    /// Rebuild material from the characters following its code.
    ///
    /// Pad bits must be zero; anything else is rejected rather than
    /// truncated.
    pub(crate) fn from_body(code: &'static str, sizage: Sizage, body: &str) -> Result<Self> {
        let ps = sizage.pad_size();
        let padded = format!("{}{body}", "A".repeat(ps));
        let paw = b64::decode(&padded)?;
        if paw.len() < ps || paw[..ps].iter().any(|b| *b != 0) {
            return Err(SignifyError::Material(format!(
                "non-zero pad bits in {code} material"
            )));
        }
        Self::from_parts(code, sizage, paw[ps..].to_vec())
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn sizage(&self) -> Sizage {
        self.sizage
    }

    /// Fully qualified Base64 text.
    pub fn qb64(&self) -> String {
        let ps = self.sizage.pad_size();
        let mut padded = vec![0u8; ps];
        padded.extend_from_slice(&self.raw);
        let encoded = b64::encode(&padded);
        format!("{}{}", self.code, &encoded[ps..])
    }

    /// Fully qualified Base64 as bytes, the form digested for next-key
    /// commitments.
    pub fn qb64b(&self) -> Vec<u8> {
        self.qb64().into_bytes()
    }

    /// Overwrite the raw bytes with zeros.
    pub(crate) fn zeroize_raw(&mut self) {
        self.raw.zeroize();
    }

    /// Is this a transferable public key (one whose control may rotate)?
    pub fn is_transferable(&self) -> bool {
        self.code != super::codes::mtr::ED25519N
    }
}

impl fmt::Debug for Matter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // seeds and salts stay out of logs
        match self.code {
            super::codes::mtr::ED25519_SEED | super::codes::mtr::SALT_128 => {
                write!(f, "Matter({}, <redacted>)", self.code)
            }
            _ => write!(f, "Matter({})", self.qb64()),
        }
    }
}

impl fmt::Display for Matter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qb64())
    }
}

impl Serialize for Matter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.qb64())
    }
}
