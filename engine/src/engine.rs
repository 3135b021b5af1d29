//! The verification engine: orchestration and storage I/O.
//!
//! Rule modules stay pure; everything that touches a store lives here.
//! One verification is a read phase that gathers evidence, a pure fusion
//! phase, and a single atomic commit of every side effect.

use std::sync::Arc;

use crate::attempt::CheckInAttempt;
use crate::device::DeviceCounts;
use crate::error::EngineError;
use crate::{audit, device, fusion, geo, host, replay, temporal, trust};
use gatecheck_store::{
    AttemptStore, DecisionCommit, DeviceObservation, DirectoryStore, HistoryFilter, StoreError,
    VerificationRecord,
};
use gatecheck_types::{
    Classification, EngineParams, EventId, HostId, QrHash, Signal, SupportDecision, Timestamp,
    UserId, VerdictAction, VerificationId,
};

/// The decision handed back for one check-in attempt.
#[derive(Clone, Debug)]
pub struct VerificationOutcome {
    pub verification_id: VerificationId,
    pub classification: Classification,
    pub risk_score: f64,
    /// Triggered signals in evaluation order.
    pub signals: Vec<Signal>,
    pub action: VerdictAction,
    pub rewards_unlocked: bool,
    pub reviews_unlocked: bool,
    pub escrow_released: bool,
}

impl VerificationOutcome {
    fn from_record(record: &VerificationRecord) -> Self {
        Self {
            verification_id: record.id,
            classification: record.classification,
            risk_score: record.risk_score,
            signals: record.signals.clone(),
            action: record.action,
            rewards_unlocked: record.rewards_unlocked,
            reviews_unlocked: record.reviews_unlocked,
            escrow_released: record.escrow_released,
        }
    }
}

/// The result of recording a support ruling.
#[derive(Clone, Debug)]
pub struct SupportOutcome {
    pub verification_id: VerificationId,
    pub decision: SupportDecision,
    pub rewards_unlocked: bool,
    pub reviews_unlocked: bool,
    pub escrow_released: bool,
}

/// The engine itself. Cheap to clone via the shared store handles; all
/// methods take `&self` and verifications for distinct users may run in
/// parallel, serialized only by each user's trust row version.
#[derive(Clone)]
pub struct VerificationEngine {
    store: Arc<dyn AttemptStore>,
    directory: Arc<dyn DirectoryStore>,
    params: EngineParams,
}

impl VerificationEngine {
    pub fn new(
        store: Arc<dyn AttemptStore>,
        directory: Arc<dyn DirectoryStore>,
        params: EngineParams,
    ) -> Self {
        Self {
            store,
            directory,
            params,
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Decide one check-in attempt against the wall clock.
    pub fn verify(
        &self,
        user_id: UserId,
        event_id: EventId,
        attempt: &CheckInAttempt,
    ) -> Result<VerificationOutcome, EngineError> {
        self.verify_at(user_id, event_id, attempt, Timestamp::now())
    }

    /// Decide one check-in attempt at an explicit decision time.
    ///
    /// Every rule and every persisted timestamp derives from `now`, so the
    /// same store state and attempt always produce the same decision.
    ///
    /// Fails closed: any error out of here means no decision was committed
    /// and the caller must treat the attempt as escalated, never accepted.
    /// A [`StoreError::Conflict`] means the user's trust row moved during
    /// evaluation; retrying is the caller's call, under its attempt key.
    pub fn verify_at(
        &self,
        user_id: UserId,
        event_id: EventId,
        attempt: &CheckInAttempt,
        now: Timestamp,
    ) -> Result<VerificationOutcome, EngineError> {
        // Reads that shape the write set propagate failure. Reads that only
        // inform a rule degrade to abstention in the helpers below.
        let event = self
            .directory
            .get_event(event_id)?
            .ok_or(EngineError::EventNotFound(event_id))?;
        let profile = self.store.get_trust_profile(user_id)?;
        let (trust_score, trust_signal) = trust::check_trust(profile.as_ref(), &self.params);

        let mut signals: Vec<Signal> = Vec::new();

        let distance = geo::check_distance(attempt.coordinates, event.location, &self.params);
        signals.extend(distance.signal);
        signals.extend(self.spoof_signal(user_id, attempt, now));

        let timing = temporal::check_timing(attempt.qr_scan_at, event.starts_at, &self.params);
        signals.extend(timing.signal);

        signals.extend(self.replay_signal(&attempt.qr_code, event_id, now));
        signals.extend(self.device_signals(attempt, user_id, now));
        signals.extend(self.host_signal(event.host_id, attempt.host_confirmed));
        signals.extend(trust_signal);

        let verdict = fusion::fuse(&signals, trust_score, &self.params);

        let id = self.store.next_verification_id()?;
        let evidence =
            audit::snapshot_evidence(attempt, &event, distance.distance_km, timing.minutes_from_start);
        let scan = audit::build_scan_log(attempt, user_id, event_id, verdict.classification, now);
        let trust_write = trust::after_decision(
            profile,
            user_id,
            verdict.classification,
            &signals,
            now,
            &self.params,
        );
        let record = audit::build_record(id, user_id, event_id, &verdict, signals, evidence, now);

        let commit = DecisionCommit {
            record,
            trust: trust_write,
            device: device_observation(attempt, user_id, now),
            scan,
        };
        self.store.commit_decision(&commit)?;

        tracing::info!(
            verification = %id,
            user = %user_id,
            event = %event_id,
            classification = %commit.record.classification,
            risk = commit.record.risk_score,
            signals = commit.record.signals.len(),
            "check-in decided"
        );

        Ok(VerificationOutcome::from_record(&commit.record))
    }

    /// Record a support ruling on a decided verification.
    pub fn record_support_decision(
        &self,
        id: VerificationId,
        decision: SupportDecision,
        notes: Option<String>,
    ) -> Result<SupportOutcome, EngineError> {
        self.record_support_decision_at(id, decision, notes, Timestamp::now())
    }

    /// Record a support ruling at an explicit time.
    ///
    /// One ruling per record: a second submission fails with
    /// [`EngineError::SupportDecisionAlreadyRecorded`], so a re-sent
    /// correction can never stack trust adjustments.
    pub fn record_support_decision_at(
        &self,
        id: VerificationId,
        decision: SupportDecision,
        notes: Option<String>,
        now: Timestamp,
    ) -> Result<SupportOutcome, EngineError> {
        let record = self
            .store
            .get_verification(id)?
            .ok_or(EngineError::VerificationNotFound(id))?;

        if let Some(existing) = record.support_decision {
            return Err(EngineError::SupportDecisionAlreadyRecorded { id, existing });
        }

        let user_id = record.user_id;
        let patched = audit::apply_support_decision(record, decision, notes, now);

        // Inconclusive never touches the ledger; a confirmed ruling on a
        // user the ledger has never seen adjusts nothing either.
        let trust_write = if matches!(decision, SupportDecision::Inconclusive) {
            None
        } else {
            self.store
                .get_trust_profile(user_id)?
                .and_then(|profile| {
                    trust::after_support_decision(profile, decision, now, &self.params)
                })
        };

        self.store
            .commit_support_decision(&patched, trust_write.as_ref())?;

        tracing::info!(
            verification = %id,
            user = %user_id,
            decision = %decision,
            "support ruling recorded"
        );

        Ok(SupportOutcome {
            verification_id: id,
            decision,
            rewards_unlocked: patched.rewards_unlocked,
            reviews_unlocked: patched.reviews_unlocked,
            escrow_released: patched.escrow_released,
        })
    }

    /// Fetch one decided record.
    pub fn get_verification(
        &self,
        id: VerificationId,
    ) -> Result<Option<VerificationRecord>, EngineError> {
        Ok(self.store.get_verification(id)?)
    }

    /// Query decided records, newest first. The filter's own limit applies
    /// when set, clamped to the configured ceiling.
    pub fn verification_history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<Vec<VerificationRecord>, EngineError> {
        let limit = filter
            .limit
            .unwrap_or(self.params.history_default_limit)
            .min(self.params.history_max_limit);
        Ok(self.store.verification_history(filter, limit)?)
    }

    fn spoof_signal(
        &self,
        user_id: UserId,
        attempt: &CheckInAttempt,
        now: Timestamp,
    ) -> Option<Signal> {
        let prior = match self.store.latest_verification(user_id) {
            Ok(prior) => prior,
            Err(err) => {
                tracing::warn!(
                    user = %user_id,
                    error = %err,
                    "prior verification unavailable, spoof check abstains"
                );
                return None;
            }
        };
        geo::check_spoof(prior.as_ref(), attempt.coordinates, now, &self.params)
    }

    fn replay_signal(&self, qr_code: &str, event_id: EventId, now: Timestamp) -> Option<Signal> {
        let qr = QrHash::from_scan(qr_code);
        let latest = match self.store.latest_scan(&qr, event_id) {
            Ok(latest) => latest,
            Err(err) => {
                tracing::warn!(
                    event = %event_id,
                    error = %err,
                    "scan log unavailable, replay check abstains"
                );
                return None;
            }
        };
        replay::check_replay(latest.as_ref(), now, &self.params)
    }

    /// Device rules abstain as a block when any of their reads fails;
    /// partial counts would misgrade a device rather than miss it.
    fn device_signals(
        &self,
        attempt: &CheckInAttempt,
        user_id: UserId,
        now: Timestamp,
    ) -> Vec<Signal> {
        let Some(hash) = attempt.device_hash.as_deref() else {
            return Vec::new();
        };
        match self.device_counts(hash, user_id, now) {
            Ok(counts) => device::check_device(&counts, &self.params),
            Err(err) => {
                tracing::warn!(
                    user = %user_id,
                    error = %err,
                    "device history unavailable, device checks abstain"
                );
                Vec::new()
            }
        }
    }

    fn device_counts(
        &self,
        hash: &str,
        user_id: UserId,
        now: Timestamp,
    ) -> Result<DeviceCounts, StoreError> {
        let since = now.saturating_sub_secs(self.params.device_simultaneous_window_secs);
        Ok(DeviceCounts {
            users_on_device: self.store.users_on_device(hash)?.len(),
            devices_for_user: self.store.devices_for_user_since(user_id, since)?.len(),
            flagged: self.store.device_flagged(hash)?,
        })
    }

    fn host_signal(&self, host_id: HostId, host_confirmed: Option<bool>) -> Option<Signal> {
        // The rating read only matters for an explicit denial.
        if host_confirmed != Some(false) {
            return None;
        }
        let rating = match self.directory.host_rating(host_id) {
            Ok(rating) => rating,
            Err(err) => {
                tracing::warn!(
                    host = %host_id,
                    error = %err,
                    "host rating unavailable, denial graded as soft"
                );
                None
            }
        };
        host::check_host(host_confirmed, rating, &self.params)
    }
}

fn device_observation(
    attempt: &CheckInAttempt,
    user_id: UserId,
    now: Timestamp,
) -> Option<DeviceObservation> {
    attempt.device_hash.clone().map(|device_hash| DeviceObservation {
        device_hash,
        user_id,
        device_os: attempt.device_os.clone(),
        app_instance_id: attempt.app_instance_id.clone(),
        seen_at: now,
    })
}
