//! Time utilities for signify-core.
//!
//! The remote agent parses ISO-8601 timestamps with microsecond precision
//! and an explicit `+00:00` offset, never a trailing `Z`.

use chrono::{DateTime, Utc};

/// Return the current time as whole seconds since the Unix epoch.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Format a UTC instant the way the agent expects it.
pub fn to_agent_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Current time as an agent timestamp, e.g. `2023-08-30T17:22:54.183000+00:00`.
pub fn agent_timestamp() -> String {
    to_agent_timestamp(Utc::now())
}
