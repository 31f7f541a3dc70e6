//! Secure random number generation.
//!
//! Uses the operating system's cryptographic random source via `rand`.

use rand::RngCore;

use crate::cesr::{mtr, Codec};
use crate::crypto::keys::PASSCODE_LEN;
use crate::error::Result;

/// Fill a buffer with cryptographically secure random bytes.
pub fn fill_random(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

/// Generate a fixed-size array of cryptographically secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    fill_random(&mut buf);
    buf
}

/// Generate a random 16-byte salt.
pub fn random_salt_16() -> [u8; 16] {
    random_bytes()
}

/// Generate a fresh 21-character passcode.
///
/// The passcode is the Base64 body of a random 128-bit salt, so it can be
/// fed straight back into [`Salter::from_passcode`](super::keys::Salter::from_passcode).
pub fn random_passcode() -> Result<String> {
    let salt = Codec::standard().material(mtr::SALT_128, random_salt_16())?;
    Ok(salt.qb64()[2..2 + PASSCODE_LEN].to_owned())
}
