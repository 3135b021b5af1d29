//! Attendance verification engine.
//!
//! One check-in attempt runs through six rule families:
//! 1. **Geospatial**: venue distance and physically implausible jumps.
//! 2. **Temporal**: scan timing against the event schedule.
//! 3. **Replay**: the same QR payload presented twice in quick succession.
//! 4. **Device**: shared devices, device hopping, operator-flagged hardware.
//! 5. **Host attestation**: an explicit denial from the event host.
//! 6. **Trust ledger**: the user's own track record.
//!
//! Risk fusion turns the triggered signals plus the trust score into a
//! verdict, and every side effect of the decision (audit record, trust
//! write, device fold, scan append) commits atomically. Support rulings
//! can later override a verdict's unlocks, once per record.
//!
//! Rule modules are pure functions over their inputs; [`engine`] holds all
//! storage I/O, so identical store state always replays to the identical
//! decision.

pub mod attempt;
pub mod audit;
pub mod device;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod geo;
pub mod host;
pub mod replay;
pub mod temporal;
pub mod trust;

pub use attempt::CheckInAttempt;
pub use engine::{SupportOutcome, VerificationEngine, VerificationOutcome};
pub use error::EngineError;
pub use fusion::Verdict;
