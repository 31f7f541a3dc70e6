//! Key state of the local controller and of its remote agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cesr::{mtr, Codec, Matter};
use crate::error::{Result, SignifyError};
use crate::event::{Event, Serder, Threshold};

/// What the controller knows about its own key event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyState {
    pub prefix: String,
    pub sn: u64,
    /// SAID of the last accepted event.
    pub said: String,
    pub signing_threshold: Threshold,
    pub keys: Vec<String>,
    pub next_threshold: Threshold,
    pub next_digests: Vec<String>,
    pub delegator: Option<String>,
}

impl KeyState {
    /// State after an inception event.
    pub fn from_inception(serder: &Serder) -> Result<Self> {
        let Event::Inception(icp) = serder.event() else {
            return Err(SignifyError::Sequence(format!(
                "key state must start at an inception, got {}",
                serder.event().ilk()
            )));
        };
        Ok(Self {
            prefix: icp.prefix.clone(),
            sn: serder.sn()?,
            said: icp.said.clone(),
            signing_threshold: icp.signing_threshold.clone(),
            keys: icp.keys.clone(),
            next_threshold: icp.next_threshold.clone(),
            next_digests: icp.next_digests.clone(),
            delegator: icp.delegator.clone(),
        })
    }

    /// Does `serder` extend this state by exactly one event?
    ///
    /// The event must belong to the same prefix, carry the next sequence
    /// number and name the last accepted event as its prior.
    pub fn check_successor(&self, serder: &Serder) -> Result<()> {
        if serder.prefix() != self.prefix {
            return Err(SignifyError::Sequence(format!(
                "event for {} does not belong to {}",
                serder.prefix(),
                self.prefix
            )));
        }
        let sn = serder.sn()?;
        if sn != self.sn + 1 {
            return Err(SignifyError::Sequence(format!(
                "expected sequence number {}, got {sn}",
                self.sn + 1
            )));
        }
        match serder.event().prior() {
            Some(prior) if prior == self.said => Ok(()),
            Some(prior) => Err(SignifyError::Sequence(format!(
                "event at {sn} chains to {prior}, last accepted event is {}",
                self.said
            ))),
            None => Err(SignifyError::Sequence(format!(
                "{} cannot follow an existing event",
                serder.event().ilk()
            ))),
        }
    }

    /// State after `serder`, which must extend this state.
    pub fn apply(&self, serder: &Serder) -> Result<Self> {
        self.check_successor(serder)?;
        let mut next = self.clone();
        next.sn = serder.sn()?;
        next.said = serder.said().to_owned();
        if let Event::Rotation(rot) = serder.event() {
            next.signing_threshold = rot.signing_threshold.clone();
            next.keys = rot.keys.clone();
            next.next_threshold = rot.next_threshold.clone();
            next.next_digests = rot.next_digests.clone();
        }
        Ok(next)
    }

    /// Build from a state notice published by the agent.
    pub fn from_record(record: &KeyStateRecord) -> Result<Self> {
        Ok(Self {
            prefix: record.i.clone(),
            sn: parse_sn(&record.s)?,
            said: record.d.clone(),
            signing_threshold: record.kt.clone(),
            keys: record.k.clone(),
            next_threshold: record.nt.clone(),
            next_digests: record.n.clone(),
            delegator: record.di.clone().filter(|d| !d.is_empty()),
        })
    }
}

/// Key state notice as the agent serializes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStateRecord {
    #[serde(default)]
    pub vn: Vec<u32>,
    pub i: String,
    pub s: String,
    #[serde(default)]
    pub p: String,
    pub d: String,
    #[serde(default)]
    pub f: String,
    #[serde(default)]
    pub dt: String,
    pub et: String,
    pub kt: Threshold,
    pub k: Vec<String>,
    pub nt: Threshold,
    pub n: Vec<String>,
    #[serde(default)]
    pub bt: String,
    #[serde(default)]
    pub b: Vec<String>,
    #[serde(default)]
    pub c: Vec<String>,
    #[serde(default)]
    pub ee: Value,
    #[serde(default)]
    pub di: Option<String>,
}

/// The controller entry of an agent state response: its key state
/// notice and its latest establishment event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerRecord {
    pub state: KeyStateRecord,
    #[serde(default)]
    pub ee: Value,
}

/// The remote agent: a delegated identifier whose delegator is our
/// controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub pre: String,
    /// Delegator named by the agent's inception: must be our controller.
    pub anchor: String,
    pub verfer: Matter,
    pub next_digest: Matter,
    pub said: String,
    pub sn: u64,
}

impl Agent {
    /// Parse the agent's key state, which must come from a delegated
    /// inception with exactly one key and one next digest.
    pub fn parse(codec: &Codec, record: &KeyStateRecord) -> Result<Self> {
        if record.et != "dip" {
            return Err(SignifyError::TrustEstablishment(format!(
                "invalid agent inception event type {}",
                record.et
            )));
        }
        let anchor = match record.di.as_deref() {
            Some(di) if !di.is_empty() => di.to_owned(),
            _ => {
                return Err(SignifyError::TrustEstablishment(
                    "agent inception has no anchor to a controller".into(),
                ))
            }
        };
        let [key] = record.k.as_slice() else {
            return Err(SignifyError::TrustEstablishment(format!(
                "agent inception must have exactly one key, got {}",
                record.k.len()
            )));
        };
        let [next] = record.n.as_slice() else {
            return Err(SignifyError::TrustEstablishment(format!(
                "agent inception must have exactly one next key digest, got {}",
                record.n.len()
            )));
        };
        let verfer = codec.decode(key)?;
        if verfer.code() != mtr::ED25519 {
            return Err(SignifyError::TrustEstablishment(format!(
                "agent key must be a transferable Ed25519 key, got {} material",
                verfer.code()
            )));
        }
        Ok(Self {
            pre: record.i.clone(),
            anchor,
            verfer,
            next_digest: codec.decode(next)?,
            said: record.d.clone(),
            sn: parse_sn(&record.s)?,
        })
    }
}

fn parse_sn(s: &str) -> Result<u64> {
    u64::from_str_radix(s, 16)
        .map_err(|_| SignifyError::Sequence(format!("invalid sequence number {s:?}")))
}
