//! Version strings: `KERI10JSON0000fd_`.
//!
//! Protocol, major and minor version, serialization kind, and the total
//! serialized size as six hex digits. The width never changes, so the size
//! can be patched in after the event has been measured.

use std::fmt;

use crate::error::{Result, SignifyError};

pub const PROTOCOL: &str = "KERI";
pub const KIND_JSON: &str = "JSON";
pub const MAJOR: u8 = 1;
pub const MINOR: u8 = 0;

/// Length of a version string in characters.
pub const VERSION_LEN: usize = 17;

const SIZE_WIDTH: usize = 6;
const MAX_SIZE: usize = (1 << (SIZE_WIDTH * 4)) - 1;

/// A parsed version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub protocol: String,
    pub major: u8,
    pub minor: u8,
    pub kind: String,
    pub size: usize,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:x}{:x}{}{:06x}_",
            self.protocol, self.major, self.minor, self.kind, self.size
        )
    }
}

/// Version string for a JSON event of `size` bytes.
pub fn versify(size: usize) -> Result<String> {
    if size > MAX_SIZE {
        return Err(SignifyError::Version(format!(
            "event of {size} bytes exceeds the version size field"
        )));
    }
    Ok(Version {
        protocol: PROTOCOL.into(),
        major: MAJOR,
        minor: MINOR,
        kind: KIND_JSON.into(),
        size,
    }
    .to_string())
}

/// Parse a version string.
pub fn deversify(vs: &str) -> Result<Version> {
    let bad = || SignifyError::Version(format!("malformed version string {vs:?}"));
    if vs.len() != VERSION_LEN || !vs.is_ascii() || !vs.ends_with('_') {
        return Err(bad());
    }
    let protocol = &vs[..4];
    let kind = &vs[6..10];
    if !protocol.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(bad());
    }
    let major = u8::from_str_radix(&vs[4..5], 16).map_err(|_| bad())?;
    let minor = u8::from_str_radix(&vs[5..6], 16).map_err(|_| bad())?;
    let size = usize::from_str_radix(&vs[10..16], 16).map_err(|_| bad())?;

    if protocol != PROTOCOL {
        return Err(SignifyError::Version(format!("unsupported protocol {protocol}")));
    }
    if kind != KIND_JSON {
        return Err(SignifyError::Version(format!("unsupported serialization {kind}")));
    }
    if major != MAJOR {
        return Err(SignifyError::Version(format!(
            "unsupported major version {major}"
        )));
    }
    Ok(Version {
        protocol: protocol.into(),
        major,
        minor,
        kind: kind.into(),
        size,
    })
}
