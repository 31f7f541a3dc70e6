//! Edge cases: malformed qualified material must be rejected, never
//! silently truncated or padded.

use signify_core::cesr::{mtr, Codec, IndexedSignature};
use signify_core::crypto::{Digester, KeyPair, Tier};
use signify_core::event::{incept, Serder};
use signify_core::SignifyError;

const K0: &str = "DAUDqkmn-hqlQKD8W-FAEa5JUvJC2I9yarEem-AAEg3e";

#[test]
fn empty_and_unknown_codes() {
    let codec = Codec::standard();
    assert!(matches!(codec.decode(""), Err(SignifyError::Material(_))));
    assert!(matches!(codec.decode("~AUDqkmn"), Err(SignifyError::Material(_))));
    // 'Z' selects a one-character code but is not in the table
    assert!(codec.decode(&format!("Z{}", &K0[1..])).is_err());
}

#[test]
fn wrong_lengths() {
    let codec = Codec::standard();
    assert!(codec.decode(&K0[..43]).is_err());
    assert!(codec.decode(&format!("{K0}A")).is_err());
    assert!(codec.material(mtr::ED25519, vec![0u8; 31]).is_err());
    assert!(codec.material(mtr::ED25519, vec![0u8; 33]).is_err());
}

#[test]
fn non_zero_pad_bits_rejected() {
    let codec = Codec::standard();
    // the top two bits after a one-character code are pad
    let tampered = format!("D_{}", &K0[2..]);
    assert!(codec.decode(&tampered).is_err());
}

#[test]
fn decode_prefix_reads_one_primitive() {
    let codec = Codec::standard();
    let digest = Digester::default().digest(b"abc", mtr::BLAKE3_256).unwrap();
    let stream = format!("{K0}{}", digest.qb64());

    let (first, used) = codec.decode_prefix(&stream).unwrap();
    assert_eq!(first.qb64(), K0);
    assert_eq!(used, 44);
    let (second, _) = codec.decode_prefix(&stream[used..]).unwrap();
    assert_eq!(second, digest);
}

#[test]
fn indexed_signature_edge_cases() {
    let kp = KeyPair::from_seed(&Codec::standard(), &[6u8; 32], Tier::Low, true).unwrap();
    let sig = signify_core::crypto::signing::sign_indexed(&kp, b"msg", 63, false).unwrap();
    let qb64 = sig.qb64().unwrap();
    assert_eq!(qb64.len(), 88);
    assert_eq!(IndexedSignature::from_qb64(&qb64).unwrap(), sig);

    // indexes past one Base64 digit need the big codes
    let big = signify_core::crypto::signing::sign_indexed(&kp, b"msg", 64, false).unwrap();
    let big_qb64 = big.qb64().unwrap();
    assert!(big_qb64.starts_with("2A"));
    assert_eq!(big_qb64.len(), 92);

    assert!(IndexedSignature::from_qb64(&qb64[..87]).is_err());
    assert!(IndexedSignature::from_qb64("").is_err());
}

#[test]
fn event_with_lying_version_rejected() {
    let icp = incept(&Digester::default(), vec![K0.into()], vec![], None).unwrap();
    let mut raw = icp.raw().to_vec();
    raw.push(b' ');
    assert!(matches!(Serder::from_raw(&raw), Err(SignifyError::Version(_))));

    let text = icp.text().replace("KERI10JSON", "KERI20JSON");
    assert!(Serder::from_raw(text.as_bytes()).is_err());
}

#[test]
fn tampered_event_fails_said_check() {
    let d = Digester::default();
    let icp = incept(&d, vec![K0.into()], vec![], None).unwrap();
    let tampered = icp.text().replace(r#""bt":"0""#, r#""bt":"1""#);
    let parsed = Serder::from_raw(tampered.as_bytes()).unwrap();
    assert!(matches!(
        parsed.verify_said(&d),
        Err(SignifyError::DigestMismatch { .. })
    ));
}
