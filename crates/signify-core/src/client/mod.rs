//! Talking to the agent: configuration, the HTTP seam and the
//! authenticated connection.

pub mod config;
pub mod connection;
pub mod transport;

pub use config::{ClientConfig, DEFAULT_URL};
pub use connection::{AgentState, Connection};
#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
pub use transport::{transport_error, HttpRequest, HttpResponse, Transport};
