//! Sealing secrets to an Ed25519 public key.
//!
//! The recipient's signing key is mapped onto X25519. The sender makes an
//! ephemeral X25519 key pair, derives a ChaCha20-Poly1305 key and nonce
//! from the shared secret with HKDF-SHA256, and prefixes the ciphertext
//! with the ephemeral public key. Only the holder of the recipient's
//! signing key can open the result.
//!
//! Sealed qb64 salts (24 characters) become `1AAH` cipher material and
//! sealed qb64 seeds (44 characters) become `P` cipher material.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::cesr::{mtr, Codec, Matter};
use crate::crypto::keys::KeyPair;
use crate::error::{Result, SignifyError};

const SEAL_INFO: &[u8] = b"signify/seal";
const EPK_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// Seal `plaintext` to the holder of `recipient`'s signing key.
///
/// The plaintext must be a qb64 salt or a qb64 seed, which fixes the
/// length of the resulting cipher material.
pub fn seal(codec: &Codec, recipient: &Matter, plaintext: &[u8]) -> Result<Matter> {
    let code = cipher_code(plaintext.len())?;
    let rpk = PublicKey::from(x25519_public(recipient)?);

    let esk = EphemeralSecret::random_from_rng(rand::rngs::OsRng);
    let epk = PublicKey::from(&esk);
    let shared = esk.diffie_hellman(&rpk);

    let (cipher, nonce) = session_cipher(shared.as_bytes(), epk.as_bytes(), rpk.as_bytes())?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| SignifyError::EncryptionFailed(format!("encrypt: {e}")))?;

    let mut raw = Vec::with_capacity(EPK_LEN + ciphertext.len());
    raw.extend_from_slice(epk.as_bytes());
    raw.extend_from_slice(&ciphertext);
    codec.material(code, raw)
}

/// Seal qb64 text, such as a salt or seed, to `recipient`.
pub fn seal_qb64(codec: &Codec, recipient: &Matter, qb64: &str) -> Result<String> {
    Ok(seal(codec, recipient, qb64.as_bytes())?.qb64())
}

/// Open cipher material sealed to `key_pair`.
pub fn open(key_pair: &KeyPair, sealed: &Matter) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.code() != mtr::X25519_CIPHER_SALT && sealed.code() != mtr::X25519_CIPHER_SEED {
        return Err(SignifyError::DecryptionFailed(format!(
            "{} is not sealed material",
            sealed.code()
        )));
    }
    let raw = sealed.raw();
    if raw.len() < EPK_LEN + TAG_LEN {
        return Err(SignifyError::DecryptionFailed("sealed material too short".into()));
    }
    let (epk_bytes, ciphertext) = raw.split_at(EPK_LEN);
    let mut epk = [0u8; EPK_LEN];
    epk.copy_from_slice(epk_bytes);
    let epk = PublicKey::from(epk);

    let ssk = StaticSecret::from(key_pair.signing_key().to_scalar_bytes());
    let rpk = PublicKey::from(&ssk);
    let shared = ssk.diffie_hellman(&epk);

    let (cipher, nonce) = session_cipher(shared.as_bytes(), epk.as_bytes(), rpk.as_bytes())?;
    cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| SignifyError::DecryptionFailed("sealed material did not authenticate".into()))
}

/// Open sealed qb64 text back into the qb64 it was made from.
pub fn open_qb64(key_pair: &KeyPair, sealed: &str) -> Result<Zeroizing<String>> {
    let matter = key_pair.codec().decode(sealed)?;
    let plain = open(key_pair, &matter)?;
    let text = std::str::from_utf8(&plain)
        .map_err(|_| SignifyError::DecryptionFailed("sealed text is not UTF-8".into()))?;
    Ok(Zeroizing::new(text.to_owned()))
}

fn cipher_code(len: usize) -> Result<&'static str> {
    match len {
        24 => Ok(mtr::X25519_CIPHER_SALT),
        44 => Ok(mtr::X25519_CIPHER_SEED),
        other => Err(SignifyError::EncryptionFailed(format!(
            "cannot seal {other} bytes; expected a qb64 salt or seed"
        ))),
    }
}

fn x25519_public(verfer: &Matter) -> Result<[u8; 32]> {
    Ok(KeyPair::verifying_key_from(verfer)?
        .to_montgomery()
        .to_bytes())
}

fn session_cipher(
    shared: &[u8; 32],
    epk: &[u8; 32],
    rpk: &[u8; 32],
) -> Result<(ChaCha20Poly1305, [u8; 12])> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(epk);
    salt[32..].copy_from_slice(rpk);

    let hk = Hkdf::<Sha256>::new(Some(&salt[..]), shared);
    let mut okm = Zeroizing::new([0u8; 44]);
    hk.expand(SEAL_INFO, &mut okm[..])
        .map_err(|e| SignifyError::EncryptionFailed(format!("HKDF expand: {e}")))?;

    let cipher = ChaCha20Poly1305::new_from_slice(&okm[..32])
        .map_err(|e| SignifyError::EncryptionFailed(format!("cipher init: {e}")))?;
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&okm[32..]);
    Ok((cipher, nonce))
}
