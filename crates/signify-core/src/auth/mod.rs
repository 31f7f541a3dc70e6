//! Mutual HTTP-signature authentication.

pub mod authenticator;
pub mod headers;

pub use authenticator::{Authenticator, DEFAULT_FIELDS};
pub use headers::{
    Headers, SignatureHeader, SignatureInput, HEADER_CONTENT_TYPE, HEADER_RESOURCE, HEADER_SIG,
    HEADER_SIG_INPUT, HEADER_SIG_TIME,
};
