//! Abstract storage traits for the GateCheck verification engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The engine depends only on the traits, so tests can swap in a
//! deterministic store and production can swap backends without touching
//! rule code.

pub mod commit;
pub mod device;
pub mod error;
pub mod event;
pub mod host;
pub mod scan;
pub mod trust;
pub mod verification;

pub use commit::{DecisionCommit, DecisionStore, TrustWrite};
pub use device::{DeviceFingerprint, DeviceObservation, DeviceStore};
pub use error::StoreError;
pub use event::{Event, EventStore};
pub use host::HostStore;
pub use scan::{QrScanLog, QrScanStore};
pub use trust::{TrustStore, UserTrustProfile};
pub use verification::{EvidenceSnapshot, HistoryFilter, VerificationRecord, VerificationStore};

/// Everything the engine needs from its own state store.
///
/// Blanket-implemented for any type providing the pieces, so backends only
/// implement the individual traits.
pub trait AttemptStore:
    VerificationStore + TrustStore + DeviceStore + QrScanStore + DecisionStore + Send + Sync
{
}

impl<T> AttemptStore for T where
    T: VerificationStore + TrustStore + DeviceStore + QrScanStore + DecisionStore + Send + Sync
{
}

/// Read-only view of the platform directory (events and host reputation).
///
/// Kept separate from [`AttemptStore`] because deployments usually back it
/// with a different system than the engine's own tables.
pub trait DirectoryStore: EventStore + HostStore + Send + Sync {}

impl<T> DirectoryStore for T where T: EventStore + HostStore + Send + Sync {}
