//! Peer-to-peer exchange (`exn`) messages.
//!
//! An exchange can carry other events inside its `e` block. The block is
//! made self-addressing before the envelope is, so the envelope's SAID
//! commits to the exact embedded events. Each embed also gets a pathed
//! attachment group holding either its signature or, for an embed the
//! recipient can fetch on its own, its SAID.

use serde_json::{Map, Value};

use crate::cesr::{mtr, pather, Counter, CounterCode, IndexedSignature};
use crate::crypto::Digester;
use crate::error::{Result, SignifyError};
use crate::event::serder::{DUMMY, SAID_LEN};
use crate::event::{Event, ExchangeEvent, Ilk, Serder};
use crate::time;

/// A built exchange message and its attachment stream.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub exn: Serder,
    /// CESR attachment groups for the embeds; empty when there are none.
    pub attachment: Vec<u8>,
}

impl Exchange {
    pub fn attachment_text(&self) -> &str {
        std::str::from_utf8(&self.attachment).unwrap_or_default()
    }
}

struct Embed {
    label: String,
    serder: Serder,
    signature: Option<IndexedSignature>,
}

/// Builder for exchange messages.
pub struct ExchangeBuilder {
    route: String,
    sender: String,
    recipient: String,
    payload: Map<String, Value>,
    modifiers: Map<String, Value>,
    timestamp: Option<String>,
    prior: String,
    embeds: Vec<Embed>,
}

impl ExchangeBuilder {
    /// Start an exchange from `sender` on `route`.
    pub fn new(route: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            sender: sender.into(),
            recipient: String::new(),
            payload: Map::new(),
            modifiers: Map::new(),
            timestamp: None,
            prior: String::new(),
            embeds: Vec::new(),
        }
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    pub fn payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn modifiers(mut self, modifiers: Map<String, Value>) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Override the message timestamp. Defaults to now.
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// SAID of the exchange this one responds to.
    pub fn prior(mut self, prior: impl Into<String>) -> Self {
        self.prior = prior.into();
        self
    }

    /// Embed an event under `label`, with its signature if it has one.
    pub fn embed(
        mut self,
        label: impl Into<String>,
        serder: Serder,
        signature: Option<IndexedSignature>,
    ) -> Self {
        self.embeds.push(Embed {
            label: label.into(),
            serder,
            signature,
        });
        self
    }

    pub fn build(self, digester: &Digester) -> Result<Exchange> {
        let mut embeds = Map::new();
        let mut attachment = String::new();
        for embed in &self.embeds {
            if embed.label == "d" || embeds.contains_key(&embed.label) {
                return Err(SignifyError::Material(format!(
                    "duplicate embed label {:?}",
                    embed.label
                )));
            }
            embeds.insert(embed.label.clone(), embed.serder.to_value()?);
            let material = match &embed.signature {
                Some(sig) => sig.qb64()?,
                None => embed.serder.said().to_owned(),
            };
            attachment.push_str(&pathed_group(&embed.label, &material)?);
        }
        if !embeds.is_empty() {
            embeds = saidify_block(digester, embeds)?;
        }

        let mut attributes = Map::new();
        attributes.insert("i".into(), Value::String(self.recipient.clone()));
        attributes.extend(self.payload);

        let event = ExchangeEvent {
            version: String::new(),
            ilk: Ilk::Exn,
            said: String::new(),
            sender: self.sender,
            recipient: self.recipient,
            prior: self.prior,
            timestamp: self.timestamp.unwrap_or_else(time::agent_timestamp),
            route: self.route,
            modifiers: self.modifiers,
            attributes,
            embeds,
        };
        let exn = Serder::saidify(digester, Event::Exchange(event))?;
        log::debug!(
            "built exn {} on {} with {} embeds",
            exn.said(),
            route_of(&exn),
            self.embeds.len()
        );
        Ok(Exchange {
            exn,
            attachment: attachment.into_bytes(),
        })
    }
}

fn route_of(exn: &Serder) -> &str {
    match exn.event() {
        Event::Exchange(e) => &e.route,
        _ => "",
    }
}

/// `-L` group wrapping the path `-e-{label}` and the material at it.
fn pathed_group(label: &str, material: &str) -> Result<String> {
    let pathed = format!("{}{material}", pather(&["e", label])?);
    let counter = Counter::new(CounterCode::PathedMaterialQuadlets, (pathed.len() / 4) as u32)?;
    Ok(format!("{}{pathed}", counter.qb64()))
}

/// Append a `d` field holding the Blake3 SAID of the unversioned block.
fn saidify_block(digester: &Digester, mut block: Map<String, Value>) -> Result<Map<String, Value>> {
    block.insert("d".into(), Value::String(DUMMY.to_string().repeat(SAID_LEN)));
    let raw = serde_json::to_vec(&block)?;
    let said = digester.digest(&raw, mtr::BLAKE3_256)?.qb64();
    block.insert("d".into(), Value::String(said));
    Ok(block)
}
