//! Verification record storage trait.

use crate::StoreError;
use gatecheck_types::{
    Classification, EventId, GeoPoint, Signal, SupportDecision, Timestamp, UserId, VerdictAction,
    VerificationId,
};
use serde::{Deserialize, Serialize};

/// Everything the engine saw when it decided, frozen for audit.
///
/// Fields are `None` when the attempt simply did not carry them; the record
/// must let a reviewer re-derive the verdict without any other table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub user_location: Option<GeoPoint>,
    pub event_location: Option<GeoPoint>,
    pub distance_km: Option<f64>,
    pub qr_scan_at: Option<Timestamp>,
    pub event_starts_at: Option<Timestamp>,
    pub event_ends_at: Option<Timestamp>,
    pub minutes_from_start: Option<f64>,
    pub device_hash: Option<String>,
    pub device_os: Option<String>,
    pub app_instance_id: Option<String>,
    pub host_confirmed: Option<bool>,
}

/// One decided check-in attempt.
///
/// Created once per attempt and patched at most once more, when support
/// rules on it. Everything else is immutable after the first write.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: VerificationId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub classification: Classification,
    pub risk_score: f64,
    pub action: VerdictAction,
    /// Triggered signals in evaluation order.
    pub signals: Vec<Signal>,
    pub evidence: EvidenceSnapshot,
    pub rewards_unlocked: bool,
    pub reviews_unlocked: bool,
    pub escrow_released: bool,
    pub model_version: String,
    pub created_at: Timestamp,
    pub support_decision: Option<SupportDecision>,
    pub support_decision_at: Option<Timestamp>,
    pub support_notes: Option<String>,
}

/// Filter for history queries. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct HistoryFilter {
    pub user_id: Option<UserId>,
    pub event_id: Option<EventId>,
    pub classification: Option<Classification>,
    /// Maximum records returned; `None` lets the caller's default apply.
    pub limit: Option<usize>,
}

impl HistoryFilter {
    /// Whether a record passes every set field of this filter.
    pub fn matches(&self, record: &VerificationRecord) -> bool {
        self.user_id.is_none_or(|u| record.user_id == u)
            && self.event_id.is_none_or(|e| record.event_id == e)
            && self
                .classification
                .is_none_or(|c| record.classification == c)
    }
}

/// Trait for reading persisted verification records.
///
/// All writes go through [`crate::DecisionStore`] so they stay atomic with
/// the rest of the decision's side effects.
pub trait VerificationStore {
    /// Fetch one record by id.
    fn get_verification(&self, id: VerificationId)
        -> Result<Option<VerificationRecord>, StoreError>;

    /// The user's most recent record, if any.
    fn latest_verification(&self, user: UserId) -> Result<Option<VerificationRecord>, StoreError>;

    /// Records matching the filter, newest first, up to `limit`.
    fn verification_history(
        &self,
        filter: &HistoryFilter,
        limit: usize,
    ) -> Result<Vec<VerificationRecord>, StoreError>;
}
