//! Count codes and path framing for attachment groups.

use crate::error::{Result, SignifyError};

use super::b64;

/// Group count codes (two hard characters, two count characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterCode {
    ControllerIdxSigs,
    WitnessIdxSigs,
    NonTransReceiptCouples,
    TransReceiptQuadruples,
    FirstSeenReplayCouples,
    TransIdxSigGroups,
    SealSourceCouples,
    TransLastIdxSigGroups,
    SealSourceTriples,
    SadPathSig,
    SadPathSigGroup,
    PathedMaterialQuadlets,
    AttachedMaterialQuadlets,
}

impl CounterCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControllerIdxSigs => "-A",
            Self::WitnessIdxSigs => "-B",
            Self::NonTransReceiptCouples => "-C",
            Self::TransReceiptQuadruples => "-D",
            Self::FirstSeenReplayCouples => "-E",
            Self::TransIdxSigGroups => "-F",
            Self::SealSourceCouples => "-G",
            Self::TransLastIdxSigGroups => "-H",
            Self::SealSourceTriples => "-I",
            Self::SadPathSig => "-J",
            Self::SadPathSigGroup => "-K",
            Self::PathedMaterialQuadlets => "-L",
            Self::AttachedMaterialQuadlets => "-V",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "-A" => Self::ControllerIdxSigs,
            "-B" => Self::WitnessIdxSigs,
            "-C" => Self::NonTransReceiptCouples,
            "-D" => Self::TransReceiptQuadruples,
            "-E" => Self::FirstSeenReplayCouples,
            "-F" => Self::TransIdxSigGroups,
            "-G" => Self::SealSourceCouples,
            "-H" => Self::TransLastIdxSigGroups,
            "-I" => Self::SealSourceTriples,
            "-J" => Self::SadPathSig,
            "-K" => Self::SadPathSigGroup,
            "-L" => Self::PathedMaterialQuadlets,
            "-V" => Self::AttachedMaterialQuadlets,
            _ => return None,
        })
    }
}

const MAX_COUNT: u32 = 64 * 64 - 1;

/// A group count prefix such as `-LAZ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    code: CounterCode,
    count: u32,
}

impl Counter {
    pub fn new(code: CounterCode, count: u32) -> Result<Self> {
        if count > MAX_COUNT {
            return Err(SignifyError::Material(format!(
                "count {count} too large for {}",
                code.as_str()
            )));
        }
        Ok(Self { code, count })
    }

    pub fn code(&self) -> CounterCode {
        self.code
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn qb64(&self) -> String {
        // count is bounded by MAX_COUNT in the constructor
        let count = b64::int_to_b64(u64::from(self.count), 2).unwrap_or_default();
        format!("{}{count}", self.code.as_str())
    }

    pub fn from_qb64(text: &str) -> Result<Self> {
        let code = text
            .get(..2)
            .and_then(CounterCode::from_code)
            .ok_or_else(|| SignifyError::Material(format!("unknown count code in {text:?}")))?;
        let count = text
            .get(2..4)
            .ok_or_else(|| SignifyError::Material("truncated counter".into()))?;
        Self::new(code, b64::b64_to_int(count)? as u32)
    }
}

/// Encode a path into the body of an event, e.g. `["e", "icp"]` becomes
/// `-e-icp` framed as variable-length Base64 text.
///
/// The text is left-padded with `A` to a quadlet boundary; the code
/// records how many leading bytes that padding represents.
pub fn pather(path: &[&str]) -> Result<String> {
    let mut text = String::new();
    for segment in path {
        if !b64::is_b64(segment) || segment.contains('-') {
            return Err(SignifyError::Material(format!(
                "path segment {segment:?} is not base64 text"
            )));
        }
        text.push('-');
        text.push_str(segment);
    }
    if text.is_empty() {
        text.push('-');
    }

    let ws = (4 - text.len() % 4) % 4;
    let code = match ws * 3 / 4 {
        0 => "4A",
        1 => "5A",
        _ => "6A",
    };
    let quadlets = (ws + text.len()) / 4;
    let count = b64::int_to_b64(quadlets as u64, 2)?;
    Ok(format!("{code}{count}{}{text}", "A".repeat(ws)))
}
