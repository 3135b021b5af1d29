//! User trust ledger storage trait.

use crate::StoreError;
use gatecheck_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Rolling trust state for one user, updated on every decision.
///
/// `version` implements optimistic concurrency: a committed write must carry
/// the version it read, and the store rejects the commit with
/// [`StoreError::Conflict`] if the row moved underneath it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserTrustProfile {
    pub user_id: UserId,
    pub trust_score: f64,
    pub total_verifications: u64,
    pub valid_count: u64,
    pub suspicious_count: u64,
    pub fraudulent_count: u64,
    pub gps_mismatch_count: u64,
    pub qr_replay_count: u64,
    pub device_anomaly_count: u64,
    pub penalties_applied: u64,
    pub last_penalty_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub last_updated: Timestamp,
    pub version: u64,
}

impl UserTrustProfile {
    /// Trust score assumed for a user the ledger has never seen.
    pub const DEFAULT_TRUST: f64 = 1.0;

    /// A fresh profile for a first-time user.
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            trust_score: Self::DEFAULT_TRUST,
            total_verifications: 0,
            valid_count: 0,
            suspicious_count: 0,
            fraudulent_count: 0,
            gps_mismatch_count: 0,
            qr_replay_count: 0,
            device_anomaly_count: 0,
            penalties_applied: 0,
            last_penalty_at: None,
            created_at: now,
            last_updated: now,
            version: 0,
        }
    }
}

/// Trait for reading trust profiles.
///
/// Writes go through [`crate::DecisionStore`] commits, which enforce the
/// version check; there is deliberately no standalone `put`.
pub trait TrustStore {
    /// Fetch a user's profile. `None` means the ledger has never seen them.
    fn get_trust_profile(&self, user: UserId) -> Result<Option<UserTrustProfile>, StoreError>;
}
