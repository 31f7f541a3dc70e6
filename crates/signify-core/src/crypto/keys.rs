//! Deterministic Ed25519 key pairs stretched from a salt.
//!
//! A [`Salter`] holds 128 bits of salt. Each key pair is derived by
//! running Argon2id over a derivation path with that salt, at a cost set
//! by the [`Tier`]. The same salt, path and tier always give the same key
//! pair, so an identifier's keys can be recovered from the passcode alone.

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::cesr::{mtr, Codec, Matter};
use crate::error::{Result, SignifyError};

/// Minimum passcode length in characters.
pub const PASSCODE_LEN: usize = 21;

/// Stretching cost for key derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Low,
    Med,
    High,
}

impl Tier {
    /// Argon2id (iterations, memory in KiB) for this tier.
    fn params(self, temp: bool) -> (u32, u32) {
        if temp {
            return (1, 8);
        }
        match self {
            Self::Low => (2, 64 * 1024),
            Self::Med => (3, 256 * 1024),
            Self::High => (4, 1024 * 1024),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = SignifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Self::Low),
            "med" => Ok(Self::Med),
            "high" => Ok(Self::High),
            other => Err(SignifyError::DerivationFailed(format!(
                "unknown tier {other:?}"
            ))),
        }
    }
}

/// Derivation path: a stem followed by the rotation index and key index
/// in lowercase hex, e.g. `signify:controller00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    pub stem: String,
    pub ridx: u32,
    pub kidx: u32,
}

impl KeyPath {
    pub fn new(stem: impl Into<String>, ridx: u32, kidx: u32) -> Self {
        Self {
            stem: stem.into(),
            ridx,
            kidx,
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:x}{:x}", self.stem, self.ridx, self.kidx)
    }
}

/// Salt from which key pairs are stretched.
#[derive(Clone)]
pub struct Salter {
    codec: Codec,
    raw: Zeroizing<[u8; 16]>,
    tier: Tier,
    temp: bool,
}

impl Salter {
    pub fn new(codec: &Codec, raw: [u8; 16], tier: Tier) -> Self {
        Self {
            codec: codec.clone(),
            raw: Zeroizing::new(raw),
            tier,
            temp: false,
        }
    }

    /// Parse a qb64 `0A` salt.
    pub fn from_qb64(codec: &Codec, qb64: &str, tier: Tier) -> Result<Self> {
        let salt = codec.decode(qb64)?;
        if salt.code() != mtr::SALT_128 {
            return Err(SignifyError::Material(format!(
                "expected a salt, got {} material",
                salt.code()
            )));
        }
        let raw: [u8; 16] = salt
            .raw()
            .try_into()
            .map_err(|_| SignifyError::Material("salt must be 16 bytes".into()))?;
        Ok(Self::new(codec, raw, tier))
    }

    /// Build the salt from a passcode: the first 21 characters become the
    /// body of a `0A` salt.
    pub fn from_passcode(codec: &Codec, passcode: &str, tier: Tier) -> Result<Self> {
        Self::from_qb64(codec, &passcode_salt(passcode)?, tier)
    }

    /// Use the cheapest stretch parameters regardless of tier.
    ///
    /// Only for tests and throwaway identifiers.
    pub fn temporary(mut self) -> Self {
        self.temp = true;
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn is_temporary(&self) -> bool {
        self.temp
    }

    pub fn qb64(&self) -> Result<String> {
        Ok(self.codec.material(mtr::SALT_128, self.raw.to_vec())?.qb64())
    }

    /// Stretch the salt over `path` into 32 bytes of seed material.
    pub fn stretch(&self, path: &str, tier: Tier) -> Result<Zeroizing<[u8; 32]>> {
        let (t_cost, m_cost) = tier.params(self.temp);
        let params = Params::new(m_cost, t_cost, 1, Some(32))
            .map_err(|e| SignifyError::DerivationFailed(format!("Argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = Zeroizing::new([0u8; 32]);
        argon2
            .hash_password_into(path.as_bytes(), &self.raw[..], &mut output[..])
            .map_err(|e| SignifyError::DerivationFailed(format!("Argon2 hash: {e}")))?;
        Ok(output)
    }

    /// Derive the key pair at `path`, at this salter's tier unless overridden.
    pub fn key_pair(&self, path: &str, tier: Option<Tier>, transferable: bool) -> Result<KeyPair> {
        let tier = tier.unwrap_or(self.tier);
        log::debug!("deriving {tier} key pair at {path}");
        let seed = self.stretch(path, tier)?;
        KeyPair::from_seed(&self.codec, &seed, tier, transferable)
    }
}

impl fmt::Debug for Salter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Salter")
            .field("tier", &self.tier)
            .field("temp", &self.temp)
            .finish_non_exhaustive()
    }
}

/// Qualify a passcode as a qb64 salt.
pub fn passcode_salt(passcode: &str) -> Result<String> {
    let body = passcode.get(..PASSCODE_LEN).ok_or_else(|| {
        SignifyError::InvalidKey(format!("passcode must be at least {PASSCODE_LEN} characters"))
    })?;
    Ok(format!("{}A{body}", mtr::SALT_128))
}

/// Derive the key pair for `path` from `salter`.
pub fn derive_key_pair(
    salter: &Salter,
    path: &KeyPath,
    tier: Tier,
    transferable: bool,
) -> Result<KeyPair> {
    salter.key_pair(&path.to_string(), Some(tier), transferable)
}

/// An Ed25519 signing key with its qualified seed and public key.
///
/// The seed is zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    codec: Codec,
    signing_key: SigningKey,
    seed: Matter,
    verfer: Matter,
    tier: Tier,
    transferable: bool,
}

impl KeyPair {
    /// Build a key pair from 32 bytes of seed material.
    pub fn from_seed(codec: &Codec, seed: &[u8; 32], tier: Tier, transferable: bool) -> Result<Self> {
        let signing_key = SigningKey::from_bytes(seed);
        let code = if transferable {
            mtr::ED25519
        } else {
            mtr::ED25519N
        };
        let verfer = codec.material(code, signing_key.verifying_key().to_bytes())?;
        let seed = codec.material(mtr::ED25519_SEED, seed.to_vec())?;
        Ok(Self {
            codec: codec.clone(),
            signing_key,
            seed,
            verfer,
            tier,
            transferable,
        })
    }

    /// Rebuild a key pair from a qb64 `A` seed.
    pub fn from_seed_qb64(codec: &Codec, qb64: &str, tier: Tier, transferable: bool) -> Result<Self> {
        let seed = codec.decode(qb64)?;
        if seed.code() != mtr::ED25519_SEED {
            return Err(SignifyError::InvalidKey(format!(
                "expected an Ed25519 seed, got {} material",
                seed.code()
            )));
        }
        let mut bytes: [u8; 32] = seed
            .raw()
            .try_into()
            .map_err(|_| SignifyError::InvalidKey("seed must be 32 bytes".into()))?;
        let kp = Self::from_seed(codec, &bytes, tier, transferable);
        bytes.zeroize();
        kp
    }

    /// Reconstruct a verifying key from qualified public key material.
    pub fn verifying_key_from(verfer: &Matter) -> Result<VerifyingKey> {
        match verfer.code() {
            mtr::ED25519 | mtr::ED25519N => {}
            other => {
                return Err(SignifyError::InvalidKey(format!(
                    "expected an Ed25519 public key, got {other} material"
                )))
            }
        }
        let bytes: [u8; 32] = verfer
            .raw()
            .try_into()
            .map_err(|_| SignifyError::InvalidKey("public key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| SignifyError::InvalidKey(format!("invalid verifying key: {e}")))
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Qualified public key.
    pub fn verfer(&self) -> &Matter {
        &self.verfer
    }

    /// Qualified private seed.
    pub fn seed(&self) -> &Matter {
        &self.seed
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn transferable(&self) -> bool {
        self.transferable
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.seed.zeroize_raw();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("verfer", &self.verfer)
            .field("tier", &self.tier)
            .field("transferable", &self.transferable)
            .finish_non_exhaustive()
    }
}
