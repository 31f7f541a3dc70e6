//! Self-addressing digests.
//!
//! The algorithm is selected by the derivation code the digest will be
//! tagged with, so a digest always carries enough information for a
//! receiver to recompute it.

use sha2::{Digest as _, Sha256, Sha512};

use crate::cesr::{mtr, Codec, Matter};
use crate::error::{Result, SignifyError};

/// Computes digests tagged with their derivation code.
#[derive(Debug, Clone, Default)]
pub struct Digester {
    codec: Codec,
}

impl Digester {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Digest `bytes` with the algorithm named by `code`.
    pub fn digest(&self, bytes: &[u8], code: &str) -> Result<Matter> {
        let raw: Vec<u8> = match code {
            mtr::BLAKE3_256 => blake3::hash(bytes).as_bytes().to_vec(),
            mtr::BLAKE3_512 => {
                let mut out = [0u8; 64];
                blake3::Hasher::new()
                    .update(bytes)
                    .finalize_xof()
                    .fill(&mut out);
                out.to_vec()
            }
            mtr::SHA2_256 => Sha256::digest(bytes).to_vec(),
            mtr::SHA2_512 => Sha512::digest(bytes).to_vec(),
            other => {
                return Err(SignifyError::Material(format!(
                    "unsupported digest algorithm {other:?}"
                )))
            }
        };
        self.codec.material(code, raw)
    }

    /// Does `digest` match a fresh digest of `bytes` under its own code?
    pub fn verify(&self, digest: &Matter, bytes: &[u8]) -> bool {
        self.digest(bytes, digest.code())
            .map(|fresh| fresh == *digest)
            .unwrap_or(false)
    }
}
