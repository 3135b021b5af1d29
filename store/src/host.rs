//! Host reputation storage trait.

use crate::StoreError;
use gatecheck_types::HostId;

/// Trait for looking up host reputation.
pub trait HostStore {
    /// The host's aggregate review rating on a 0–5 scale.
    /// `None` when the host has no reviews yet.
    fn host_rating(&self, host: HostId) -> Result<Option<f64>, StoreError>;
}
