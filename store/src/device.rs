//! Device fingerprint storage trait.

use crate::StoreError;
use gatecheck_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// One (device, user) pairing observed at check-in time.
///
/// Keyed by `device_hash` × `user_id`; the same physical device produces one
/// row per user that checked in from it. `is_flagged` and `flag_reason` are
/// set by operators out of band and survive upserts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    pub device_hash: String,
    pub user_id: UserId,
    pub device_os: Option<String>,
    pub app_instance_id: Option<String>,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub check_in_count: u64,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
}

impl DeviceFingerprint {
    /// A fresh pairing first observed at `now`.
    pub fn new(device_hash: String, user_id: UserId, now: Timestamp) -> Self {
        Self {
            device_hash,
            user_id,
            device_os: None,
            app_instance_id: None,
            first_seen: now,
            last_seen: now,
            check_in_count: 0,
            is_flagged: false,
            flag_reason: None,
        }
    }

    /// Fold one observation into this row. Flag state is untouched; only an
    /// operator clears it.
    pub fn absorb(&mut self, obs: &DeviceObservation) {
        self.last_seen = obs.seen_at;
        self.check_in_count += 1;
        if obs.device_os.is_some() {
            self.device_os = obs.device_os.clone();
        }
        if obs.app_instance_id.is_some() {
            self.app_instance_id = obs.app_instance_id.clone();
        }
    }
}

/// What one check-in attempt saw of a device. The store folds this into the
/// fingerprint row inside the decision transaction, so concurrent attempts
/// from the same device cannot lose each other's bumps.
#[derive(Clone, Debug)]
pub struct DeviceObservation {
    pub device_hash: String,
    pub user_id: UserId,
    pub device_os: Option<String>,
    pub app_instance_id: Option<String>,
    pub seen_at: Timestamp,
}

impl DeviceObservation {
    /// The fingerprint row this observation creates when none exists yet.
    pub fn into_fingerprint(self) -> DeviceFingerprint {
        DeviceFingerprint {
            first_seen: self.seen_at,
            last_seen: self.seen_at,
            check_in_count: 1,
            is_flagged: false,
            flag_reason: None,
            device_hash: self.device_hash,
            user_id: self.user_id,
            device_os: self.device_os,
            app_instance_id: self.app_instance_id,
        }
    }
}

/// Trait for reading device fingerprints.
///
/// Upserts ride along [`crate::DecisionStore`] commits.
pub trait DeviceStore {
    /// Fetch one (device, user) pairing.
    fn get_fingerprint(
        &self,
        device_hash: &str,
        user: UserId,
    ) -> Result<Option<DeviceFingerprint>, StoreError>;

    /// Distinct users that have checked in from this device.
    fn users_on_device(&self, device_hash: &str) -> Result<Vec<UserId>, StoreError>;

    /// Distinct device hashes this user has appeared on since `since`.
    fn devices_for_user_since(
        &self,
        user: UserId,
        since: Timestamp,
    ) -> Result<Vec<String>, StoreError>;

    /// Whether any pairing for this device has been flagged by an operator.
    fn device_flagged(&self, device_hash: &str) -> Result<bool, StoreError>;

    /// Flag or clear every pairing for this device. Support tooling calls
    /// this out of band; decision commits never touch flag state. Returns
    /// the number of rows touched, zero when the device has never been seen.
    fn set_device_flagged(
        &self,
        device_hash: &str,
        flagged: bool,
        reason: Option<&str>,
    ) -> Result<u64, StoreError>;
}
