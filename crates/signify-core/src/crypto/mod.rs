//! Cryptographic primitives for signify.
//!
//! This module provides:
//! - Salted Argon2id derivation of Ed25519 key pairs
//! - Ed25519 signing and verification over qualified material
//! - Blake3 and SHA-2 self-addressing digests
//! - Sealing secrets to a public key (X25519, HKDF-SHA256, ChaCha20-Poly1305)
//! - Cryptographically secure random number generation

pub mod digest;
pub mod keys;
pub mod random;
pub mod sealing;
pub mod signing;

pub use digest::Digester;
pub use keys::{derive_key_pair, KeyPair, KeyPath, Salter, Tier};
