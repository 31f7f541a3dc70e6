//! Serialized events with embedded self-addressing identifiers.
//!
//! A [`Serder`] pairs an [`Event`] with its exact wire bytes. Building one
//! sizes the version string, computes the SAID over the bytes with the
//! identifier fields stubbed, and substitutes the SAID back in. The
//! version-string and digest widths are fixed, so the size measured with
//! the stubs in place is the final size.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::cesr::mtr;
use crate::crypto::Digester;
use crate::error::{Result, SignifyError};

use super::types::Event;
use super::version::{deversify, versify};

/// Width of a Blake3-256 SAID in characters.
pub const SAID_LEN: usize = 44;

/// Placeholder character for identifier fields while digesting.
pub const DUMMY: char = '#';

/// An event together with its canonical serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serder {
    event: Event,
    raw: Vec<u8>,
}

impl Serder {
    /// Size the version string and embed a Blake3-256 SAID.
    pub fn saidify(digester: &Digester, mut event: Event) -> Result<Self> {
        event.set_said(DUMMY.to_string().repeat(SAID_LEN));
        let stubbed = Self::sized(event)?;
        let said = digester.digest(&stubbed.raw, mtr::BLAKE3_256)?.qb64();

        let mut event = stubbed.event;
        event.set_said(said);
        let raw = serde_json::to_vec(&event)?;
        if raw.len() != stubbed.raw.len() {
            return Err(SignifyError::Version(format!(
                "event size changed from {} to {} after substituting its SAID",
                stubbed.raw.len(),
                raw.len()
            )));
        }
        Ok(Self { event, raw })
    }

    /// Size the version string without touching any identifier field.
    pub fn sized(mut event: Event) -> Result<Self> {
        event.set_version(versify(0)?);
        let size = serde_json::to_vec(&event)?.len();
        event.set_version(versify(size)?);
        let raw = serde_json::to_vec(&event)?;
        Ok(Self { event, raw })
    }

    /// Parse a received event and check its framing.
    ///
    /// The version string must declare exactly the number of bytes given.
    /// Call [`verify_said`](Self::verify_said) to check the SAID.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw)?;
        let vs = value
            .get("v")
            .and_then(Value::as_str)
            .ok_or_else(|| SignifyError::Version("event has no version string".into()))?;
        let version = deversify(vs)?;
        if version.size != raw.len() {
            return Err(SignifyError::Version(format!(
                "version string declares {} bytes, got {}",
                version.size,
                raw.len()
            )));
        }
        Ok(Self {
            event: Event::from_value(value)?,
            raw: raw.to_vec(),
        })
    }

    /// Rebuild from an already-parsed event body.
    pub fn from_event(event: Event) -> Result<Self> {
        let raw = serde_json::to_vec(&event)?;
        Self::from_raw(&raw)
    }

    /// Recompute the SAID over the stubbed canonical form and compare it
    /// to the embedded one.
    pub fn verify_said(&self, digester: &Digester) -> Result<()> {
        let embedded = self.event.said();
        let code = digester.codec().decode(embedded)?.code();

        let mut stubbed = self.event.clone();
        stubbed.set_said(DUMMY.to_string().repeat(embedded.len()));
        if let Event::Inception(icp) = &mut stubbed {
            // a prefix that differs from the SAID is not self-addressing
            if self.event.prefix() != embedded {
                icp.prefix = self.event.prefix().to_owned();
            }
        }
        let computed = digester.digest(&serde_json::to_vec(&stubbed)?, code)?.qb64();
        if computed != embedded {
            return Err(SignifyError::DigestMismatch {
                embedded: embedded.to_owned(),
                computed,
            });
        }
        Ok(())
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The wire bytes as text. Serialization is always JSON.
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.raw).unwrap_or_default()
    }

    pub fn said(&self) -> &str {
        self.event.said()
    }

    pub fn prefix(&self) -> &str {
        self.event.prefix()
    }

    /// Sequence number of a key event.
    pub fn sn(&self) -> Result<u64> {
        match self.event.sn() {
            Some(sn) => sn,
            None => Err(SignifyError::Sequence(format!(
                "{} events carry no sequence number",
                self.event.ilk()
            ))),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.event)?)
    }
}

impl Serialize for Serder {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.event.serialize(serializer)
    }
}
