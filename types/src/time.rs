//! Timestamp type used throughout the engine.
//!
//! Timestamps are Unix epoch seconds (UTC). Client-supplied timestamps
//! (QR scan times) are compared against server-observed time, so
//! second-level resolution is sufficient everywhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    /// Saturates to zero if `now` is earlier.
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Signed seconds from `other` to `self`. Negative when `self` is earlier.
    pub fn signed_secs_since(&self, other: Timestamp) -> i64 {
        self.0 as i64 - other.0 as i64
    }

    /// The timestamp `secs` seconds before this one, saturating at epoch.
    pub fn saturating_sub_secs(&self, secs: u64) -> Timestamp {
        Self(self.0.saturating_sub(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
