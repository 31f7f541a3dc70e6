//! Multisig Exchange — embed a signed inception in an exchange message and
//! check what a recipient would receive.
//!
//! Run with:
//!   cargo run --example multisig_exchange -p signify-core

use serde_json::{json, Map};

use signify_core::cesr::Codec;
use signify_core::crypto::{signing, Digester, KeyPair, Tier};
use signify_core::event::{incept, Serder};
use signify_core::exchange::ExchangeBuilder;

fn main() {
    let codec = Codec::standard();
    let digester = Digester::default();

    // ── Setup: two members and the group they incept ───────────────────────
    let alice = KeyPair::from_seed(&codec, &[1u8; 32], Tier::Low, true).expect("alice key");
    let bob = KeyPair::from_seed(&codec, &[2u8; 32], Tier::Low, true).expect("bob key");
    let group = incept(
        &digester,
        vec![alice.verfer().qb64(), bob.verfer().qb64()],
        vec![],
        None,
    )
    .expect("group inception");
    println!("Group {} with 2 keys", group.prefix());

    // ── 1. Alice signs the group inception as member 0 ─────────────────────
    let sig = signing::sign_indexed(&alice, group.raw(), 0, false).expect("signing");

    // ── 2. Wrap it in an exchange to Bob ────────────────────────────────────
    let mut payload = Map::new();
    payload.insert("gid".into(), json!(group.prefix()));
    payload.insert("smids".into(), json!(["EAlice", "EBob"]));
    let exn = ExchangeBuilder::new("/multisig/icp", "EAlice")
        .recipient("EBob")
        .payload(payload)
        .embed("icp", group.clone(), Some(sig))
        .build(&digester)
        .expect("exchange build");

    println!("Exchange {}", exn.exn.said());
    println!("  Body:       {}", exn.exn.text());
    println!("  Attachment: {}", exn.attachment_text());
    println!();

    // ── 3. What Bob checks on receipt ───────────────────────────────────────
    let received = Serder::from_raw(exn.exn.raw()).expect("framing");
    received.verify_said(&digester).expect("envelope SAID");
    let embedded = received.to_value().expect("json")["e"]["icp"].clone();
    assert_eq!(embedded["d"], group.said());
    println!("Bob verified the envelope and found group {}", embedded["i"]);
}
