//! Stress test: a controller rotates through a long chain of passcodes;
//! every rotation must honour the previous commitment and extend the log
//! by exactly one event.

use signify_core::cesr::{mtr, Codec, IndexedSignature};
use signify_core::controller::Controller;
use signify_core::crypto::{signing, Salter, Tier};
use signify_core::SignifyError;

const BRAN: &str = "0123456789abcdefghijk";

fn passcode(i: usize) -> String {
    format!("{i:0>21}")
}

fn controller() -> Controller {
    let codec = Codec::standard();
    let salter = Salter::from_passcode(&codec, BRAN, Tier::Low)
        .unwrap()
        .temporary();
    Controller::from_salter(&codec, salter, 0).unwrap()
}

#[test]
fn stress_rotation_chain_of_25() {
    let mut ctrl = controller();
    let pre = ctrl.pre().to_owned();
    let codec = Codec::standard();

    for i in 1..=25 {
        let committed = ctrl.state().next_digests.clone();
        let prior = ctrl.state().said.clone();
        let request = ctrl.rotate(&passcode(i), &[]).unwrap();
        let keys = request.rot.event().keys().unwrap().to_vec();

        assert_eq!(request.rot.event().prior(), Some(prior.as_str()));
        let exposed = ctrl
            .digester()
            .digest(keys[0].as_bytes(), mtr::BLAKE3_256)
            .unwrap();
        assert_eq!(vec![exposed.qb64()], committed, "rotation {i} breaks commitment");

        for (sig, key) in request.sigs.iter().zip(&keys) {
            let sig = IndexedSignature::from_qb64(sig).unwrap();
            let verfer = codec.decode(key).unwrap();
            assert!(signing::verify_indexed(&verfer, request.rot.raw(), &sig));
        }

        ctrl.confirm().unwrap();
        assert_eq!(ctrl.state().sn, i as u64);
        assert_eq!(ctrl.pre(), pre);
    }
    // sequence numbers past 9 are hex encoded
    assert_eq!(ctrl.serder().to_value().unwrap()["s"], "19");
}

#[test]
fn stress_abandoned_rotations_do_not_advance() {
    let mut ctrl = controller();
    let before = ctrl.state().clone();

    for i in 0..20 {
        ctrl.rotate(&passcode(i), &[]).unwrap();
        ctrl.abandon();
    }
    assert_eq!(ctrl.state(), &before);

    // a rotation staged after all the abandoned ones still chains to inception
    let request = ctrl.rotate(&passcode(99), &[]).unwrap();
    assert_eq!(request.rot.sn().unwrap(), 1);
    ctrl.confirm().unwrap();
    assert_eq!(ctrl.state().sn, 1);
}

#[test]
fn stress_stale_confirmation_rejected() {
    let mut ctrl = controller();
    ctrl.rotate(&passcode(1), &[]).unwrap();
    ctrl.confirm().unwrap();
    assert!(matches!(ctrl.confirm(), Err(SignifyError::Sequence(_))));
    assert_eq!(ctrl.state().sn, 1);
}
