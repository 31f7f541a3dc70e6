//! Integration test: known-answer vectors.
//!
//! Pins the wire format end to end: derived keys, SAIDs, version sizes,
//! indexed signatures and exchange attachment groups must match these
//! values byte for byte or peers will reject our messages.

use signify_core::cesr::{mtr, Codec};
use signify_core::controller::Controller;
use signify_core::crypto::keys::passcode_salt;
use signify_core::crypto::{signing, Digester, KeyPair, Salter, Tier};
use signify_core::event::{incept, interact, Event, Ilk, InceptionEvent, Serder, Threshold};
use signify_core::exchange::ExchangeBuilder;

const RAW_SALT: [u8; 16] = [
    5, 170, 143, 45, 83, 154, 233, 250, 85, 156, 2, 156, 155, 8, 72, 117,
];
const K0: &str = "DAUDqkmn-hqlQKD8W-FAEa5JUvJC2I9yarEem-AAEg3e";
const N0: &str = "EAKUR-LmLHWMwXTLWQ1QjxHrihBmwwrV2tYaSG7hOrWj";
const ICP_SAID: &str = "ECHOi6qRaswNpvytpCtpvEh2cB2aLAwVHBLFinno3YVW";
const IXN_SAID: &str = "EDPhSeHvthC0cUPnxQAGMYMlSNvSHR-d1vUHC5OEr0Ft";
const DT: &str = "2023-08-30T17:22:54.183Z";

fn key_a() -> KeyPair {
    Salter::new(&Codec::standard(), RAW_SALT, Tier::Low)
        .temporary()
        .key_pair("A", None, true)
        .unwrap()
}

/// An inception with empty identifier fields, sized but never saidified.
fn sized_inception() -> Serder {
    Serder::sized(Event::Inception(InceptionEvent {
        version: String::new(),
        ilk: Ilk::Icp,
        said: String::new(),
        prefix: String::new(),
        sn: "0".into(),
        signing_threshold: Threshold::simple(1),
        keys: vec![K0.into()],
        next_threshold: Threshold::simple(1),
        next_digests: vec![N0.into()],
        witness_threshold: "0".into(),
        witnesses: vec![],
        config: vec![],
        anchors: vec![],
        delegator: None,
    }))
    .unwrap()
}

fn exchange() -> ExchangeBuilder {
    ExchangeBuilder::new("/multisig/vcp", "test").timestamp(DT)
}

#[test]
fn derived_key_and_next_commitment() {
    let kp = key_a();
    assert_eq!(kp.verfer().qb64(), K0);
    assert_eq!(kp.verfer().code(), mtr::ED25519);

    let icp = incept(&Digester::default(), vec![K0.into()], vec![N0.into()], None).unwrap();
    assert_eq!(icp.said(), ICP_SAID);
    assert_eq!(icp.prefix(), ICP_SAID);
    assert_eq!(icp.event().version(), "KERI10JSON00012b_");
}

#[test]
fn interaction_chains_to_inception() {
    let d = Digester::default();
    let icp = incept(&d, vec![K0.into()], vec![N0.into()], None).unwrap();
    let ixn = interact(&d, icp.prefix(), icp.said(), 1, vec![]).unwrap();
    assert_eq!(ixn.said(), IXN_SAID);
    assert_eq!(ixn.event().version(), "KERI10JSON0000cb_");

    // a receiver re-parses the exact bytes and re-derives the SAID
    let parsed = Serder::from_raw(ixn.raw()).unwrap();
    parsed.verify_said(&d).unwrap();
}

#[test]
fn passcode_controller() {
    let bran = "0123456789abcdefghijk";
    assert_eq!(passcode_salt(bran).unwrap(), format!("0AA{bran}"));

    let codec = Codec::standard();
    let salter = Salter::from_passcode(&codec, bran, Tier::Low).unwrap().temporary();
    let ctrl = Controller::from_salter(&codec, salter, 0).unwrap();
    assert_eq!(ctrl.pre(), "ELvxjlGm4zGdItzUa6Mg0ZP_gvvbisl7N5DUceKdOqGj");
    assert_eq!(
        ctrl.signer().verfer().qb64(),
        "DI8TzRA1PRYIuuiLMwCsFWDGLMOEsmdfFRG-LwaPijR3"
    );
    assert_eq!(
        ctrl.state().next_digests,
        vec!["EJssCVsi0UjQz7PsoypqIUg2dLgibge5FTesS5cDHGOy".to_owned()]
    );
}

#[test]
fn exchange_with_signed_sized_inception() {
    let icp = sized_inception();
    assert_eq!(icp.event().version(), "KERI10JSON0000d3_");

    let sig = signing::sign_indexed(&key_a(), icp.raw(), 0, false).unwrap();
    let sig_qb64 = sig.qb64().unwrap();
    assert_eq!(
        sig_qb64,
        "AAAPkMTS3LrrhVuQB0k4UndDN0xIfEiKYaN7rTlQ_q9ImnBcugwNO8VWTALXzWoaldJEC1IOpEGkEnjZfxxIleoI"
    );

    let exn = exchange()
        .embed("icp", icp, Some(sig))
        .build(&Digester::default())
        .unwrap();
    let value = exn.exn.to_value().unwrap();
    assert_eq!(value["e"]["d"], "EBizoZIws8udMEvRMYT9UJ9H-01nIRruZpL4XoYXjs0I");
    assert_eq!(exn.exn.said(), "EJOE1aQEL3wZpC6DU-uF64-lB0cuUhJESWk6-G7cYqE4");
    assert_eq!(exn.exn.event().version(), "KERI10JSON0001cb_");
    assert_eq!(exn.attachment_text(), format!("-LAZ5AACAA-e-icp{sig_qb64}"));
}

#[test]
fn exchange_with_signed_and_referenced_embeds() {
    let d = Digester::default();
    let icp = incept(&d, vec![K0.into()], vec![N0.into()], None).unwrap();
    let ixn = interact(&d, icp.prefix(), icp.said(), 1, vec![]).unwrap();

    let sig = signing::sign_indexed(&key_a(), icp.raw(), 0, false).unwrap();
    let sig_qb64 = sig.qb64().unwrap();
    assert_eq!(
        sig_qb64,
        "AAAB_KqjwoH02JiBD2h-dbf45Mh4aYMNDGJNL3BqeptF6-d0fDA6OIReSrtfnRb6p89GkuKtuZWCsfNJoYpLzuIN"
    );

    let exn = exchange()
        .embed("icp", icp, Some(sig))
        .embed("ixn", ixn, None)
        .build(&d)
        .unwrap();
    let value = exn.exn.to_value().unwrap();
    assert_eq!(value["e"]["d"], "EFfTBusQ9eJ_1EK4GLUiXCUQXfJ4p3qcup6g_6Pu9A2r");
    assert_eq!(exn.exn.said(), "EGrdj223fm0hG536FTZlOcNV8WcH4rbdgFDggyruSkzk");
    assert_eq!(exn.exn.event().version(), "KERI10JSON0002f5_");
    assert_eq!(
        exn.attachment_text(),
        format!("-LAZ5AACAA-e-icp{sig_qb64}-LAO5AACAA-e-ixn{IXN_SAID}")
    );

    // the envelope re-parses and its SAID checks out
    Serder::from_raw(exn.exn.raw()).unwrap().verify_said(&d).unwrap();
}
