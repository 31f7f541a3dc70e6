//! Typed event bodies.
//!
//! Each event type is its own struct, and the struct field order is the
//! wire field order. Self-addressing digests are computed over the
//! serialized bytes, so the order must never be changed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SignifyError};

/// Event type tag (the `t` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ilk {
    Icp,
    Rot,
    Ixn,
    Dip,
    Drt,
    Exn,
}

impl Ilk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icp => "icp",
            Self::Rot => "rot",
            Self::Ixn => "ixn",
            Self::Dip => "dip",
            Self::Drt => "drt",
            Self::Exn => "exn",
        }
    }

    pub fn is_establishment(&self) -> bool {
        matches!(self, Self::Icp | Self::Rot | Self::Dip | Self::Drt)
    }
}

impl std::fmt::Display for Ilk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signing threshold: a hex count, or fractional weights per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Simple(String),
    Weighted(Vec<String>),
}

impl Threshold {
    pub fn simple(n: u64) -> Self {
        Self::Simple(format!("{n:x}"))
    }

    /// Majority of `n` keys, at least one.
    pub fn majority(n: usize) -> Self {
        Self::simple(n.div_ceil(2).max(1) as u64)
    }
}

/// Anchored data in the `a` field of key events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seal {
    /// Reference to another identifier's event.
    Event { i: String, s: String, d: String },
    /// Bare digest commitment.
    Digest { d: String },
    Other(Value),
}

impl Seal {
    pub fn event(prefix: impl Into<String>, sn: u64, said: impl Into<String>) -> Self {
        Self::Event {
            i: prefix.into(),
            s: format!("{sn:x}"),
            d: said.into(),
        }
    }
}

/// Inception (`icp`) or delegated inception (`dip`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InceptionEvent {
    #[serde(rename = "v")]
    pub version: String,
    #[serde(rename = "t")]
    pub ilk: Ilk,
    #[serde(rename = "d")]
    pub said: String,
    #[serde(rename = "i")]
    pub prefix: String,
    #[serde(rename = "s")]
    pub sn: String,
    #[serde(rename = "kt")]
    pub signing_threshold: Threshold,
    #[serde(rename = "k")]
    pub keys: Vec<String>,
    #[serde(rename = "nt")]
    pub next_threshold: Threshold,
    #[serde(rename = "n")]
    pub next_digests: Vec<String>,
    #[serde(rename = "bt")]
    pub witness_threshold: String,
    #[serde(rename = "b")]
    pub witnesses: Vec<String>,
    #[serde(rename = "c")]
    pub config: Vec<String>,
    #[serde(rename = "a")]
    pub anchors: Vec<Seal>,
    #[serde(rename = "di", default, skip_serializing_if = "Option::is_none")]
    pub delegator: Option<String>,
}

/// Rotation (`rot`) or delegated rotation (`drt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEvent {
    #[serde(rename = "v")]
    pub version: String,
    #[serde(rename = "t")]
    pub ilk: Ilk,
    #[serde(rename = "d")]
    pub said: String,
    #[serde(rename = "i")]
    pub prefix: String,
    #[serde(rename = "s")]
    pub sn: String,
    #[serde(rename = "p")]
    pub prior: String,
    #[serde(rename = "kt")]
    pub signing_threshold: Threshold,
    #[serde(rename = "k")]
    pub keys: Vec<String>,
    #[serde(rename = "nt")]
    pub next_threshold: Threshold,
    #[serde(rename = "n")]
    pub next_digests: Vec<String>,
    #[serde(rename = "bt")]
    pub witness_threshold: String,
    #[serde(rename = "br")]
    pub witnesses_removed: Vec<String>,
    #[serde(rename = "ba")]
    pub witnesses_added: Vec<String>,
    #[serde(rename = "a")]
    pub anchors: Vec<Seal>,
}

/// Interaction (`ixn`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(rename = "v")]
    pub version: String,
    #[serde(rename = "t")]
    pub ilk: Ilk,
    #[serde(rename = "d")]
    pub said: String,
    #[serde(rename = "i")]
    pub prefix: String,
    #[serde(rename = "s")]
    pub sn: String,
    #[serde(rename = "p")]
    pub prior: String,
    #[serde(rename = "a")]
    pub anchors: Vec<Seal>,
}

/// Peer-to-peer exchange message (`exn`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeEvent {
    #[serde(rename = "v")]
    pub version: String,
    #[serde(rename = "t")]
    pub ilk: Ilk,
    #[serde(rename = "d")]
    pub said: String,
    #[serde(rename = "i")]
    pub sender: String,
    #[serde(rename = "rp")]
    pub recipient: String,
    #[serde(rename = "p")]
    pub prior: String,
    #[serde(rename = "dt")]
    pub timestamp: String,
    #[serde(rename = "r")]
    pub route: String,
    #[serde(rename = "q")]
    pub modifiers: Map<String, Value>,
    #[serde(rename = "a")]
    pub attributes: Map<String, Value>,
    #[serde(rename = "e")]
    pub embeds: Map<String, Value>,
}

/// Any event this client builds or parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Inception(InceptionEvent),
    Rotation(RotationEvent),
    Interaction(InteractionEvent),
    Exchange(ExchangeEvent),
}

impl Event {
    /// Parse an event body, dispatching on its `t` field.
    pub fn from_value(value: Value) -> Result<Self> {
        let ilk: Ilk = value
            .get("t")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| SignifyError::Material("event has no type field".into()))?;
        Ok(match ilk {
            Ilk::Icp | Ilk::Dip => Self::Inception(serde_json::from_value(value)?),
            Ilk::Rot | Ilk::Drt => Self::Rotation(serde_json::from_value(value)?),
            Ilk::Ixn => Self::Interaction(serde_json::from_value(value)?),
            Ilk::Exn => Self::Exchange(serde_json::from_value(value)?),
        })
    }

    pub fn ilk(&self) -> Ilk {
        match self {
            Self::Inception(e) => e.ilk,
            Self::Rotation(e) => e.ilk,
            Self::Interaction(e) => e.ilk,
            Self::Exchange(e) => e.ilk,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Self::Inception(e) => &e.version,
            Self::Rotation(e) => &e.version,
            Self::Interaction(e) => &e.version,
            Self::Exchange(e) => &e.version,
        }
    }

    pub(crate) fn set_version(&mut self, version: String) {
        match self {
            Self::Inception(e) => e.version = version,
            Self::Rotation(e) => e.version = version,
            Self::Interaction(e) => e.version = version,
            Self::Exchange(e) => e.version = version,
        }
    }

    pub fn said(&self) -> &str {
        match self {
            Self::Inception(e) => &e.said,
            Self::Rotation(e) => &e.said,
            Self::Interaction(e) => &e.said,
            Self::Exchange(e) => &e.said,
        }
    }

    /// Set the `d` field, and the prefix too when the prefix is itself
    /// self-addressing (inception events).
    pub(crate) fn set_said(&mut self, said: String) {
        match self {
            Self::Inception(e) => {
                e.prefix = said.clone();
                e.said = said;
            }
            Self::Rotation(e) => e.said = said,
            Self::Interaction(e) => e.said = said,
            Self::Exchange(e) => e.said = said,
        }
    }

    /// Identifier prefix of the key event log, or the sender of an exchange.
    pub fn prefix(&self) -> &str {
        match self {
            Self::Inception(e) => &e.prefix,
            Self::Rotation(e) => &e.prefix,
            Self::Interaction(e) => &e.prefix,
            Self::Exchange(e) => &e.sender,
        }
    }

    /// Sequence number of a key event; `None` for exchanges.
    pub fn sn(&self) -> Option<Result<u64>> {
        let sn = match self {
            Self::Inception(e) => &e.sn,
            Self::Rotation(e) => &e.sn,
            Self::Interaction(e) => &e.sn,
            Self::Exchange(_) => return None,
        };
        Some(
            u64::from_str_radix(sn, 16)
                .map_err(|_| SignifyError::Sequence(format!("invalid sequence number {sn:?}"))),
        )
    }

    /// Digest of the prior event, for events that chain to one.
    pub fn prior(&self) -> Option<&str> {
        match self {
            Self::Rotation(e) => Some(&e.prior),
            Self::Interaction(e) => Some(&e.prior),
            Self::Inception(_) | Self::Exchange(_) => None,
        }
    }

    /// Current signing keys of an establishment event.
    pub fn keys(&self) -> Option<&[String]> {
        match self {
            Self::Inception(e) => Some(&e.keys),
            Self::Rotation(e) => Some(&e.keys),
            Self::Interaction(_) | Self::Exchange(_) => None,
        }
    }

    /// Next key digests of an establishment event.
    pub fn next_digests(&self) -> Option<&[String]> {
        match self {
            Self::Inception(e) => Some(&e.next_digests),
            Self::Rotation(e) => Some(&e.next_digests),
            Self::Interaction(_) | Self::Exchange(_) => None,
        }
    }

    /// Delegator of a delegated inception.
    pub fn delegator(&self) -> Option<&str> {
        match self {
            Self::Inception(e) => e.delegator.as_deref(),
            _ => None,
        }
    }
}
