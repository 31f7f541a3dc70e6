//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::crypto::keys::Tier;

/// Default agent admin endpoint.
pub const DEFAULT_URL: &str = "http://127.0.0.1:3901";

/// Where the agent lives and how expensive key derivation should be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Agent admin URL, without a trailing slash.
    pub url: String,
    #[serde(default)]
    pub tier: Tier,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, tier: Tier) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_owned(),
            tier,
        }
    }

    /// Absolute URL for an agent path such as `/agent/{aid}`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL, Tier::default())
    }
}
