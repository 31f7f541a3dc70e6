//! URL-safe Base64 helpers used by every CESR primitive.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{Result, SignifyError};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Value of a single Base64 character.
pub fn b64_index(c: u8) -> Option<u32> {
    match c {
        b'A'..=b'Z' => Some((c - b'A') as u32),
        b'a'..=b'z' => Some((c - b'a') as u32 + 26),
        b'0'..=b'9' => Some((c - b'0') as u32 + 52),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}

/// Is every character of `s` in the URL-safe alphabet?
pub fn is_b64(s: &str) -> bool {
    s.bytes().all(|c| b64_index(c).is_some())
}

/// Encode `n` as exactly `width` Base64 digits, most significant first.
pub fn int_to_b64(mut n: u64, width: usize) -> Result<String> {
    let mut out = vec![b'A'; width];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n % 64) as usize];
        n /= 64;
    }
    if n != 0 {
        return Err(SignifyError::Material(format!(
            "value does not fit in {width} base64 digits"
        )));
    }
    // alphabet bytes are ASCII
    Ok(out.into_iter().map(char::from).collect())
}

/// Decode Base64 digits into an integer.
pub fn b64_to_int(s: &str) -> Result<u64> {
    s.bytes().try_fold(0u64, |acc, c| {
        let v = b64_index(c)
            .ok_or_else(|| SignifyError::Material(format!("invalid base64 character {:?}", c as char)))?;
        Ok(acc * 64 + u64::from(v))
    })
}

/// Encode bytes without padding characters.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded URL-safe Base64.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| SignifyError::Material(format!("invalid base64: {e}")))
}
