//! Atomic decision commits.
//!
//! A verification decision touches four tables: the record itself, the
//! user's trust profile, the device fingerprint, and the scan log. Losing
//! any one of them would skew every future decision, so backends must
//! apply a [`DecisionCommit`] in a single transaction or reject it whole.

use crate::{DeviceObservation, QrScanLog, StoreError, UserTrustProfile, VerificationRecord};
use gatecheck_types::VerificationId;

/// A versioned trust profile write.
#[derive(Clone, Debug)]
pub struct TrustWrite {
    /// The profile as it should read after the commit, `version` already
    /// bumped past `expected_version`.
    pub profile: UserTrustProfile,
    /// The version observed when the profile was read for this decision.
    /// `None` asserts the profile did not exist yet.
    pub expected_version: Option<u64>,
}

/// Everything one decision writes, applied atomically.
#[derive(Clone, Debug)]
pub struct DecisionCommit {
    pub record: VerificationRecord,
    pub trust: TrustWrite,
    /// `None` when the attempt carried no device hash. The store folds the
    /// observation into the fingerprint row inside the transaction.
    pub device: Option<DeviceObservation>,
    pub scan: QrScanLog,
}

/// Trait for persisting decisions.
pub trait DecisionStore {
    /// Allocate the next verification id. Ids are monotonic; an id burned by
    /// a commit that later fails is never reused.
    fn next_verification_id(&self) -> Result<VerificationId, StoreError>;

    /// Apply one decision's writes in a single transaction.
    ///
    /// Fails with [`StoreError::Conflict`] if the trust profile's version no
    /// longer matches `expected_version`; the caller decides whether to
    /// re-evaluate, never the store.
    fn commit_decision(&self, commit: &DecisionCommit) -> Result<(), StoreError>;

    /// Patch a record with a support ruling and, when the ruling moves
    /// trust, the matching versioned profile write, in a single transaction.
    fn commit_support_decision(
        &self,
        record: &VerificationRecord,
        trust: Option<&TrustWrite>,
    ) -> Result<(), StoreError>;
}
