//! Fundamental types for the GateCheck verification engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, timestamps, geographic points, QR hashes, fraud signals, verdicts,
//! and the tunable engine parameters.

pub mod geo;
pub mod id;
pub mod params;
pub mod qr;
pub mod signal;
pub mod time;
pub mod verdict;

pub use geo::GeoPoint;
pub use id::{EventId, HostId, UserId, VerificationId};
pub use params::EngineParams;
pub use qr::QrHash;
pub use signal::{Signal, SignalKind};
pub use time::Timestamp;
pub use verdict::{Classification, SupportDecision, VerdictAction};

/// Version tag stamped on every verification record and API report.
///
/// Bumped whenever the rule set or the severity table changes semantics, so
/// stored verdicts can be attributed to the rules that produced them.
pub const MODEL_VERSION: &str = "1.0.0-rule-enhanced";
