//! QR scan log storage trait.

use crate::StoreError;
use gatecheck_types::{EventId, QrHash, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// One observed QR scan, kept solely so later attempts can be checked
/// against the replay window. Appended for every attempt, accepted or not.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QrScanLog {
    pub qr_code_hash: QrHash,
    pub event_id: EventId,
    pub user_id: UserId,
    pub device_hash: Option<String>,
    /// When the engine observed the scan, not what the client claimed.
    pub scanned_at: Timestamp,
    pub is_valid: bool,
    pub rejection_reason: Option<String>,
}

/// Trait for reading the scan log.
///
/// Appends ride along [`crate::DecisionStore`] commits.
pub trait QrScanStore {
    /// The most recent scan of this QR hash at this event, if any.
    fn latest_scan(&self, qr: &QrHash, event: EventId) -> Result<Option<QrScanLog>, StoreError>;
}
