//! Ed25519 signing and verification over qualified material.
//!
//! Signatures come in two shapes: plain `0B` material for detached use
//! (HTTP request signing) and [`IndexedSignature`]s attached to key events.

use ed25519_dalek::{Signature, Signer, Verifier};

use crate::cesr::{mtr, IndexedSignature, Matter};
use crate::crypto::keys::KeyPair;
use crate::error::Result;

/// Sign `message`, returning `0B` signature material.
pub fn sign(key_pair: &KeyPair, message: &[u8]) -> Result<Matter> {
    let sig = key_pair.signing_key().sign(message);
    key_pair.codec().material(mtr::ED25519_SIG, sig.to_bytes())
}

/// Sign `message` as the key at `index` of an event's key list.
///
/// `current_only` marks a key that has no counterpart in the prior next
/// list, e.g. a key added during partial rotation.
pub fn sign_indexed(
    key_pair: &KeyPair,
    message: &[u8],
    index: u32,
    current_only: bool,
) -> Result<IndexedSignature> {
    let sig = key_pair.signing_key().sign(message);
    IndexedSignature::new(sig.to_bytes(), index, current_only)
}

/// Verify a signature against qualified public key material.
///
/// Returns `false` for malformed keys or signatures instead of failing.
pub fn verify(verfer: &Matter, message: &[u8], signature: &Matter) -> bool {
    if signature.code() != mtr::ED25519_SIG {
        return false;
    }
    let Ok(raw) = <[u8; 64]>::try_from(signature.raw()) else {
        return false;
    };
    verify_raw(verfer, message, &raw)
}

/// Verify an indexed signature against the key it claims to be made by.
pub fn verify_indexed(verfer: &Matter, message: &[u8], signature: &IndexedSignature) -> bool {
    verify_raw(verfer, message, signature.raw())
}

fn verify_raw(verfer: &Matter, message: &[u8], raw: &[u8; 64]) -> bool {
    let Ok(key) = KeyPair::verifying_key_from(verfer) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(raw)).is_ok()
}
