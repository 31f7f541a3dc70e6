//! Basic Controller — derive a controller from a passcode, rotate it, and
//! sign a request, all without talking to an agent.
//!
//! Run with:
//!   cargo run --example basic_controller -p signify-core

use signify_core::auth::{Authenticator, Headers, HEADER_RESOURCE, HEADER_SIG_TIME};
use signify_core::cesr::Codec;
use signify_core::controller::Controller;
use signify_core::crypto::random::random_passcode;
use signify_core::crypto::{sealing, Salter, Tier};
use signify_core::time::agent_timestamp;

fn main() {
    let codec = Codec::standard();

    // ── 1. Derive a controller ──────────────────────────────────────────────
    //
    // The passcode is stretched with Argon2id into the controller's current
    // and next key. The identifier is the digest of the inception event, so
    // the same passcode always yields the same identifier.
    let bran = random_passcode().expect("passcode generation should succeed");
    let salter = Salter::from_passcode(&codec, &bran, Tier::Low)
        .expect("passcode should be long enough")
        .temporary();
    let mut ctrl = Controller::from_salter(&codec, salter, 0).expect("controller derivation");

    println!("Controller incepted");
    println!("  Passcode:    {bran}");
    println!("  Identifier:  {}", ctrl.pre());
    println!("  Current key: {}", ctrl.signer().verfer().qb64());
    println!("  Next digest: {}", ctrl.state().next_digests[0]);
    println!("  Event:       {}", ctrl.serder().text());
    println!();

    // ── 2. Rotate to a new passcode ─────────────────────────────────────────
    //
    // The key committed at inception signs first; the new key signs as a
    // current-only signer. Nothing changes until the rotation is confirmed.
    let nbran = random_passcode().expect("passcode generation should succeed");
    let request = ctrl.rotate(&nbran, &[]).expect("rotation staging");
    println!("Rotation staged");
    println!("  Event:   {}", request.rot.said());
    println!("  Sigs:    {}", request.sigs.join(", "));
    println!("  Pending: {}", ctrl.has_pending());

    ctrl.confirm().expect("rotation should extend the key state");
    println!("  Confirmed at sequence {}", ctrl.state().sn);
    println!("  New key: {}", ctrl.signer().verfer().qb64());

    // The new salt travels sealed to the new key.
    let salt = sealing::open_qb64(ctrl.signer(), &request.sxlt).expect("sealed salt opens");
    println!("  Sealed salt opens to {}", salt.as_str());
    println!();

    // ── 3. Sign a request ───────────────────────────────────────────────────
    let verifier = Authenticator::new(ctrl.signer().clone(), ctrl.signer().verfer().clone());
    let mut headers = Headers::new();
    headers.set(HEADER_RESOURCE, ctrl.pre());
    headers.set(HEADER_SIG_TIME, agent_timestamp());
    let signed = verifier
        .sign(headers, "GET", "/identifiers")
        .expect("signing should succeed");
    println!("Signed request headers:");
    for (name, value) in signed.iter() {
        println!("  {name}: {value}");
    }
    assert!(verifier.verify(&signed, "GET", "/identifiers"));
    println!("  Verified: OK");
}
