//! Per-request HTTP signatures between a controller and its agent.
//!
//! Requests are signed with the controller's current key and responses
//! are verified against the agent's key. The signing base covers the
//! method, the path without its query string, the resource header and the
//! timestamp header, followed by the signature parameters.

use crate::cesr::Matter;
use crate::crypto::keys::KeyPair;
use crate::crypto::signing;
use crate::error::{Result, SignifyError};
use crate::time;

use super::headers::{
    Headers, SignatureHeader, SignatureInput, HEADER_RESOURCE, HEADER_SIG, HEADER_SIG_INPUT,
    HEADER_SIG_TIME,
};

/// Label of the signature entry in both signature headers.
pub const SIGNATURE_LABEL: &str = "signify";

const ALG: &str = "ed25519";

/// Header fields covered by every signature, in signing order.
pub const DEFAULT_FIELDS: [&str; 4] = ["@method", "@path", HEADER_RESOURCE, HEADER_SIG_TIME];

/// Signs outgoing headers and verifies incoming ones.
#[derive(Debug, Clone)]
pub struct Authenticator {
    signer: KeyPair,
    verfer: Matter,
}

impl Authenticator {
    /// `signer` signs our requests; `verfer` is the counterparty's key.
    pub fn new(signer: KeyPair, verfer: Matter) -> Self {
        Self { signer, verfer }
    }

    pub fn signer(&self) -> &KeyPair {
        &self.signer
    }

    pub fn verfer(&self) -> &Matter {
        &self.verfer
    }

    /// Add `Signature-Input` and `Signature` headers covering the default
    /// fields.
    ///
    /// The resource and timestamp headers must already be present.
    pub fn sign(&self, headers: Headers, method: &str, path: &str) -> Result<Headers> {
        self.sign_at(headers, method, path, time::now_secs())
    }

    fn sign_at(&self, mut headers: Headers, method: &str, path: &str, created: i64) -> Result<Headers> {
        let input = SignatureInput {
            name: SIGNATURE_LABEL.into(),
            fields: DEFAULT_FIELDS.iter().map(|f| (*f).to_owned()).collect(),
            created,
            keyid: self.signer.verfer().qb64(),
            alg: ALG.into(),
        };
        let base = signing_base(&headers, method, strip_query(path), &input).ok_or_else(|| {
            SignifyError::Authentication(format!(
                "cannot sign {method} {path}: covered header missing"
            ))
        })?;
        let sig = signing::sign(&self.signer, base.as_bytes())?;

        headers.set(HEADER_SIG_INPUT, input.to_string());
        headers.set(
            HEADER_SIG,
            SignatureHeader::new(false)
                .with_marker(SIGNATURE_LABEL, sig.qb64())
                .to_string(),
        );
        Ok(headers)
    }

    /// Check the signature on a response against the counterparty's key.
    ///
    /// Returns `false` for missing or malformed headers, for an input that
    /// does not cover every default field, and for a bad signature.
    pub fn verify(&self, headers: &Headers, method: &str, path: &str) -> bool {
        let (Some(input_header), Some(sig_header)) =
            (headers.get(HEADER_SIG_INPUT), headers.get(HEADER_SIG))
        else {
            return false;
        };
        let Ok(inputs) = SignatureInput::parse_header(input_header) else {
            return false;
        };
        let Ok(signature) = SignatureHeader::parse(sig_header) else {
            return false;
        };
        let codec = self.signer.codec();
        let path = strip_query(path);

        let mut checked = 0;
        for input in inputs.iter().filter(|i| i.name == SIGNATURE_LABEL) {
            if !DEFAULT_FIELDS
                .iter()
                .all(|field| input.fields.iter().any(|f| f == field))
            {
                log::warn!("signature by {} on {method} {path} omits covered fields", input.keyid);
                return false;
            }
            let Some(base) = signing_base(headers, method, path, input) else {
                return false;
            };
            let Some(cig) = signature
                .marker(&input.name)
                .and_then(|qb64| codec.decode(qb64).ok())
            else {
                return false;
            };
            if !signing::verify(&self.verfer, base.as_bytes(), &cig) {
                log::warn!("signature by {} on {method} {path} did not verify", input.keyid);
                return false;
            }
            checked += 1;
        }
        checked > 0
    }
}

/// Build the signing base for `input`'s covered fields.
fn signing_base(headers: &Headers, method: &str, path: &str, input: &SignatureInput) -> Option<String> {
    let mut lines = Vec::with_capacity(input.fields.len() + 1);
    for field in &input.fields {
        let value = match field.as_str() {
            "@method" => method.to_owned(),
            "@path" => path.to_owned(),
            name if name.starts_with('@') => return None,
            name => headers.get(name)?.trim().to_owned(),
        };
        lines.push(format!("\"{field}\": {value}"));
    }
    lines.push(format!("\"@signature-params: {}\"", input.params()));
    Some(lines.join("\n"))
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}
