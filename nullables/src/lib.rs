//! Nullable infrastructure for deterministic testing.
//!
//! In-memory implementations of the storage traits, with injectable faults
//! so failure paths can be exercised without a real backend.

pub mod store;

pub use store::{Failpoint, NullDirectory, NullStore};
