//! Constructors for key events.

use crate::crypto::Digester;
use crate::error::{Result, SignifyError};

use super::serder::Serder;
use super::types::{Event, Ilk, InceptionEvent, InteractionEvent, RotationEvent, Seal, Threshold};

/// Inception with a self-addressing prefix and no witnesses.
///
/// With `delegator` set the event is a delegated inception (`dip`).
pub fn incept(
    digester: &Digester,
    keys: Vec<String>,
    next_digests: Vec<String>,
    delegator: Option<String>,
) -> Result<Serder> {
    if keys.is_empty() {
        return Err(SignifyError::InvalidKey("inception needs at least one key".into()));
    }
    let ilk = if delegator.is_some() { Ilk::Dip } else { Ilk::Icp };
    let event = InceptionEvent {
        version: String::new(),
        ilk,
        said: String::new(),
        prefix: String::new(),
        sn: "0".into(),
        signing_threshold: Threshold::majority(keys.len()),
        keys,
        next_threshold: Threshold::majority(next_digests.len()),
        next_digests,
        witness_threshold: "0".into(),
        witnesses: vec![],
        config: vec![],
        anchors: vec![],
        delegator,
    };
    Serder::saidify(digester, Event::Inception(event))
}

/// Fields of a rotation that change from one establishment event to the next.
#[derive(Debug, Clone)]
pub struct RotationArgs {
    pub prefix: String,
    pub prior: String,
    pub sn: u64,
    pub keys: Vec<String>,
    pub signing_threshold: Threshold,
    pub next_digests: Vec<String>,
    pub next_threshold: Threshold,
}

/// Rotation with no witness changes and no anchors.
pub fn rotate(digester: &Digester, args: RotationArgs) -> Result<Serder> {
    if args.keys.is_empty() {
        return Err(SignifyError::InvalidKey("rotation needs at least one key".into()));
    }
    if args.sn == 0 {
        return Err(SignifyError::Sequence("rotation cannot be the first event".into()));
    }
    let event = RotationEvent {
        version: String::new(),
        ilk: Ilk::Rot,
        said: String::new(),
        prefix: args.prefix,
        sn: format!("{:x}", args.sn),
        prior: args.prior,
        signing_threshold: args.signing_threshold,
        keys: args.keys,
        next_threshold: args.next_threshold,
        next_digests: args.next_digests,
        witness_threshold: "0".into(),
        witnesses_removed: vec![],
        witnesses_added: vec![],
        anchors: vec![],
    };
    Serder::saidify(digester, Event::Rotation(event))
}

/// Interaction anchoring `anchors` after the event with digest `prior`.
pub fn interact(
    digester: &Digester,
    prefix: &str,
    prior: &str,
    sn: u64,
    anchors: Vec<Seal>,
) -> Result<Serder> {
    if sn == 0 {
        return Err(SignifyError::Sequence("interaction cannot be the first event".into()));
    }
    let event = InteractionEvent {
        version: String::new(),
        ilk: Ilk::Ixn,
        said: String::new(),
        prefix: prefix.to_owned(),
        sn: format!("{sn:x}"),
        prior: prior.to_owned(),
        anchors,
    };
    Serder::saidify(digester, Event::Interaction(event))
}
