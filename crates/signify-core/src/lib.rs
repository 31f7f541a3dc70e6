//! Signify — edge signing client for KERI agents.
//!
//! Keys never leave the client. A passcode-derived controller delegates
//! to a remote agent, approves the agent's inception, rotates its own
//! keys, and signs every HTTP request it sends; the agent's responses are
//! signed in turn and verified before they are trusted.

pub mod auth;
pub mod cesr;
pub mod client;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod event;
pub mod exchange;
pub mod time;

// Re-export primary types
pub use error::{Result, SignifyError};

pub use auth::{Authenticator, Headers};
pub use cesr::{Codec, IndexedSignature, Matter};
pub use client::{AgentState, ClientConfig, Connection, HttpRequest, HttpResponse, Transport};
pub use controller::{Agent, Controller, KeyState, ManagedIdentifier, PendingGuard};
pub use crypto::{Digester, KeyPair, Salter, Tier};
pub use event::{Event, Ilk, Serder};
pub use exchange::{Exchange, ExchangeBuilder};

#[cfg(feature = "http")]
pub use client::ReqwestTransport;
