//! Error types for signify-core.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.

/// Signify error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum SignifyError {
    /// Malformed or unknown derivation code, wrong raw length, or non-zero
    /// pad bits while decoding cryptographic material.
    #[error("Invalid material: {0}")]
    Material(String),

    /// A recomputed self-addressing digest does not match the embedded one.
    #[error("Digest mismatch: embedded {embedded}, computed {computed}")]
    DigestMismatch { embedded: String, computed: String },

    /// An event does not extend the current key state (fork or out-of-order).
    #[error("Sequence error: {0}")]
    Sequence(String),

    /// Missing authenticator or a response whose signature did not verify.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote agent does not commit to the local controller.
    #[error("Trust establishment failed: {0}")]
    TrustEstablishment(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid version string: {0}")]
    Version(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A request to the remote agent failed, either in transport
    /// (`status` is `None`) or with a non-success HTTP status.
    #[error("{method} {path} failed: {}{message}", .status.map(|s| format!("HTTP {s} - ")).unwrap_or_default())]
    Remote {
        method: String,
        path: String,
        status: Option<u16>,
        message: String,
    },
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SignifyError>;
