//! The client's own identifier: the controller that delegates to a remote
//! agent and signs on its behalf.
//!
//! Keys are derived from a passcode, so the controller can always be
//! rebuilt from the passcode alone. Events that need the agent's
//! acceptance (delegation approval, rotation) are staged first and only
//! become the controller's state through [`Controller::confirm`]; a staged
//! event that is never confirmed leaves the state untouched.

pub mod state;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cesr::{Codec, Matter};
use crate::crypto::keys::{KeyPair, KeyPath, Salter, Tier};
use crate::crypto::{sealing, signing, Digester};
use crate::error::{Result, SignifyError};
use crate::event::{self, RotationArgs, Seal, Serder, Threshold};

pub use state::{Agent, ControllerRecord, KeyState, KeyStateRecord};

/// Derivation path stem for controller keys.
pub const CONTROLLER_STEM: &str = "signify:controller";

/// A staged key event with its signatures.
#[derive(Debug, Clone, Serialize)]
pub struct SignedEvent {
    #[serde(skip)]
    pub serder: Serder,
    pub sigs: Vec<String>,
}

/// Body of a controller rotation request.
#[derive(Debug, Clone, Serialize)]
pub struct RotationRequest {
    pub rot: Serder,
    pub sigs: Vec<String>,
    /// New passcode salt, sealed to the new signing key.
    pub sxlt: String,
    /// Re-sealed key material of each managed identifier, by prefix.
    pub keys: Map<String, Value>,
}

/// An identifier whose key material the agent stores sealed to the
/// controller's signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedIdentifier {
    /// Keys derived from a sealed salt.
    Salty { prefix: String, sxlt: String },
    /// Randomly generated keys, stored as sealed current and next seeds.
    Randy {
        prefix: String,
        prxs: Vec<String>,
        nxts: Vec<String>,
    },
}

impl ManagedIdentifier {
    pub fn prefix(&self) -> &str {
        match self {
            Self::Salty { prefix, .. } | Self::Randy { prefix, .. } => prefix,
        }
    }
}

#[derive(Debug)]
enum Pending {
    Interaction(SignedEvent),
    Rotation {
        signed: SignedEvent,
        salter: Salter,
        signer: KeyPair,
        nsigner: KeyPair,
    },
}

impl Pending {
    fn serder(&self) -> &Serder {
        match self {
            Self::Interaction(signed) | Self::Rotation { signed, .. } => &signed.serder,
        }
    }
}

/// The local identifier state machine.
#[derive(Debug)]
pub struct Controller {
    codec: Codec,
    digester: Digester,
    tier: Tier,
    ridx: u32,
    salter: Salter,
    signer: KeyPair,
    nsigner: KeyPair,
    serder: Serder,
    sigs: Vec<String>,
    state: KeyState,
    pending: Option<Pending>,
}

impl Controller {
    /// Derive the controller from a passcode of at least 21 characters.
    pub fn new(codec: &Codec, passcode: &str, tier: Tier) -> Result<Self> {
        Self::from_salter(codec, Salter::from_passcode(codec, passcode, tier)?, 0)
    }

    /// Derive the controller from an explicit salter at rotation index
    /// `ridx`, incepting a fresh identifier.
    pub fn from_salter(codec: &Codec, salter: Salter, ridx: u32) -> Result<Self> {
        let tier = salter.tier();
        let digester = Digester::new(codec.clone());
        let (signer, nsigner) = derive_pair(&salter, ridx)?;
        let serder = event::incept(
            &digester,
            vec![signer.verfer().qb64()],
            vec![next_digest(&digester, &nsigner)?.qb64()],
            None,
        )?;
        let sigs = vec![signing::sign_indexed(&signer, serder.raw(), 0, false)?.qb64()?];
        let state = KeyState::from_inception(&serder)?;
        log::debug!("controller {} incepted at rotation index {ridx}", state.prefix);
        Ok(Self {
            codec: codec.clone(),
            digester,
            tier,
            ridx,
            salter,
            signer,
            nsigner,
            serder,
            sigs,
            state,
            pending: None,
        })
    }

    /// The permanent identifier.
    pub fn pre(&self) -> &str {
        &self.state.prefix
    }

    pub fn state(&self) -> &KeyState {
        &self.state
    }

    /// Last accepted event.
    pub fn serder(&self) -> &Serder {
        &self.serder
    }

    /// Controller signatures on the last accepted event.
    ///
    /// Empty after [`adopt`](Self::adopt), which takes the event but not
    /// its signatures from the agent.
    pub fn sigs(&self) -> &[String] {
        &self.sigs
    }

    /// Current signing key.
    pub fn signer(&self) -> &KeyPair {
        &self.signer
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn ridx(&self) -> u32 {
        self.ridx
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn digester(&self) -> &Digester {
        &self.digester
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The staged event awaiting confirmation, if any.
    pub fn pending(&self) -> Option<&Serder> {
        self.pending.as_ref().map(Pending::serder)
    }

    /// Take over the state the agent holds for this controller.
    ///
    /// `ridx` is the rotation index the agent reports; the signing pair is
    /// re-derived at that index when it differs from ours. The resulting
    /// signing key must be one of the remote current keys, otherwise the
    /// passcode does not control the identifier. Nothing changes on error.
    pub fn adopt(&mut self, record: &ControllerRecord, ridx: u32) -> Result<()> {
        self.ensure_idle()?;
        let remote = KeyState::from_record(&record.state)?;
        let rederived = if ridx == self.ridx {
            None
        } else {
            Some(derive_pair(&self.salter, ridx)?)
        };
        let signer = rederived.as_ref().map_or(&self.signer, |(signer, _)| signer);
        let key = signer.verfer().qb64();
        if !remote.keys.contains(&key) {
            return Err(SignifyError::TrustEstablishment(format!(
                "passcode does not control {}: key {key} at rotation index {ridx} not in current key list",
                remote.prefix
            )));
        }

        if remote.sn != 0 || remote.prefix != self.state.prefix {
            let serder = Serder::from_event(event::Event::from_value(record.ee.clone())?)?;
            serder.verify_said(&self.digester)?;
            if serder.prefix() != remote.prefix {
                return Err(SignifyError::TrustEstablishment(format!(
                    "controller event for {} does not match state for {}",
                    serder.prefix(),
                    remote.prefix
                )));
            }
            log::debug!("adopted remote state of {} at {}", remote.prefix, remote.sn);
            self.serder = serder;
            self.sigs.clear();
            self.state = remote;
        }
        if let Some((signer, nsigner)) = rederived {
            log::debug!("controller {} resumed at rotation index {ridx}", self.state.prefix);
            self.signer = signer;
            self.nsigner = nsigner;
            self.ridx = ridx;
        }
        Ok(())
    }

    /// Stage an interaction anchoring the agent's delegated inception.
    ///
    /// Fails before signing anything unless the agent's inception names
    /// this controller as its delegator.
    pub fn approve_delegation(&mut self, agent: &Agent) -> Result<SignedEvent> {
        if agent.anchor != self.state.prefix {
            return Err(SignifyError::TrustEstablishment(format!(
                "agent {} is anchored to {}, not to controller {}",
                agent.pre, agent.anchor, self.state.prefix
            )));
        }
        self.ensure_idle()?;
        let ixn = event::interact(
            &self.digester,
            &self.state.prefix,
            &self.state.said,
            self.state.sn + 1,
            vec![Seal::event(&agent.pre, agent.sn, &agent.said)],
        )?;
        let sig = signing::sign_indexed(&self.signer, ixn.raw(), 0, false)?;
        log::debug!("staged delegation approval {} for agent {}", ixn.said(), agent.pre);
        let signed = SignedEvent {
            serder: ixn,
            sigs: vec![sig.qb64()?],
        };
        self.pending = Some(Pending::Interaction(signed.clone()));
        Ok(signed)
    }

    /// Stage a rotation to keys derived from a new passcode.
    ///
    /// The pre-committed next key signs at index 0 and the new key at
    /// index 1 as a current-only signer. The new salt and every managed
    /// identifier's key material are sealed to the new key.
    pub fn rotate(&mut self, passcode: &str, managed: &[ManagedIdentifier]) -> Result<RotationRequest> {
        self.ensure_idle()?;
        let nsalter = Salter::from_passcode(&self.codec, passcode, self.tier)?;
        let nsalter = if self.salter.is_temporary() {
            nsalter.temporary()
        } else {
            nsalter
        };
        let (signer, nsigner) = derive_pair(&nsalter, 0)?;

        let rot = event::rotate(
            &self.digester,
            RotationArgs {
                prefix: self.state.prefix.clone(),
                prior: self.state.said.clone(),
                sn: self.state.sn + 1,
                keys: vec![self.nsigner.verfer().qb64(), signer.verfer().qb64()],
                signing_threshold: Threshold::Weighted(vec!["1".into(), "0".into()]),
                next_digests: vec![next_digest(&self.digester, &nsigner)?.qb64()],
                next_threshold: Threshold::simple(1),
            },
        )?;
        let sigs = vec![
            signing::sign_indexed(&self.nsigner, rot.raw(), 0, false)?.qb64()?,
            signing::sign_indexed(&signer, rot.raw(), 1, true)?.qb64()?,
        ];

        let sxlt = sealing::seal_qb64(&self.codec, signer.verfer(), &nsalter.qb64()?)?;
        let mut keys = Map::new();
        for aid in managed {
            keys.insert(aid.prefix().to_owned(), self.reseal(aid, signer.verfer())?);
        }

        log::debug!("staged rotation {} of {} to sn {}", rot.said(), self.state.prefix, self.state.sn + 1);
        self.pending = Some(Pending::Rotation {
            signed: SignedEvent {
                serder: rot.clone(),
                sigs: sigs.clone(),
            },
            salter: nsalter,
            signer,
            nsigner,
        });
        Ok(RotationRequest {
            rot,
            sigs,
            sxlt,
            keys,
        })
    }

    /// Apply the staged event after the agent accepted it.
    pub fn confirm(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| SignifyError::Sequence("no staged event to confirm".into()))?;
        let next = self.state.apply(pending.serder())?;
        match pending {
            Pending::Interaction(signed) => {
                self.serder = signed.serder;
                self.sigs = signed.sigs;
            }
            Pending::Rotation {
                signed,
                salter,
                signer,
                nsigner,
            } => {
                self.serder = signed.serder;
                self.sigs = signed.sigs;
                self.salter = salter;
                self.signer = signer;
                self.nsigner = nsigner;
                // rotated keys start over at index 0 of the new salter
                self.ridx = 0;
            }
        }
        log::debug!("confirmed {} at sn {}", self.serder.said(), next.sn);
        self.state = next;
        Ok(())
    }

    /// Drop the staged event, leaving the state as it was.
    pub fn abandon(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::warn!("abandoned staged event {}", pending.serder().said());
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        match &self.pending {
            Some(pending) => Err(SignifyError::Sequence(format!(
                "event {} is still awaiting confirmation",
                pending.serder().said()
            ))),
            None => Ok(()),
        }
    }

    /// Open `aid`'s sealed material with the current key and seal it to
    /// `recipient`.
    fn reseal(&self, aid: &ManagedIdentifier, recipient: &Matter) -> Result<Value> {
        let reseal_one = |sealed: &str| -> Result<String> {
            let plain = sealing::open_qb64(&self.signer, sealed)?;
            sealing::seal_qb64(&self.codec, recipient, &plain)
        };
        Ok(match aid {
            ManagedIdentifier::Salty { sxlt, .. } => json!({ "sxlt": reseal_one(sxlt)? }),
            ManagedIdentifier::Randy { prxs, nxts, .. } => json!({
                "prxs": prxs.iter().map(|p| reseal_one(p)).collect::<Result<Vec<_>>>()?,
                "nxts": nxts.iter().map(|n| reseal_one(n)).collect::<Result<Vec<_>>>()?,
            }),
        })
    }
}

/// Guard over a staged event: abandons it on drop unless confirmed.
///
/// Holding the guard across the round trip to the agent means a failed
/// or cancelled request can never leave a half-applied event behind.
pub struct PendingGuard<'a> {
    controller: &'a mut Controller,
    settled: bool,
}

impl<'a> PendingGuard<'a> {
    pub fn new(controller: &'a mut Controller) -> Self {
        Self {
            controller,
            settled: false,
        }
    }

    pub fn confirm(mut self) -> Result<()> {
        self.settled = true;
        self.controller.confirm()
    }

    pub fn abandon(mut self) {
        self.settled = true;
        self.controller.abandon();
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.abandon();
        }
    }
}

fn derive_pair(salter: &Salter, ridx: u32) -> Result<(KeyPair, KeyPair)> {
    let tier = salter.tier();
    let signer = salter.key_pair(&KeyPath::new(CONTROLLER_STEM, ridx, 0).to_string(), Some(tier), true)?;
    let nsigner =
        salter.key_pair(&KeyPath::new(CONTROLLER_STEM, ridx + 1, 0).to_string(), Some(tier), true)?;
    Ok((signer, nsigner))
}

/// Commitment to a next key: the digest of its qualified text.
fn next_digest(digester: &Digester, key_pair: &KeyPair) -> Result<Matter> {
    digester.digest(&key_pair.verfer().qb64b(), crate::cesr::mtr::BLAKE3_256)
}
