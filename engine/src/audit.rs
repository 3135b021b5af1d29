//! Audit trail assembly: the record, scan-log entry, and support patch.

use crate::attempt::CheckInAttempt;
use crate::fusion::Verdict;
use gatecheck_store::{Event, EvidenceSnapshot, QrScanLog, VerificationRecord};
use gatecheck_types::{
    Classification, EventId, QrHash, Signal, SupportDecision, Timestamp, UserId, VerificationId,
    MODEL_VERSION,
};

/// Freeze everything the rules saw into the record's evidence snapshot.
/// `distance_km` and `minutes_from_start` come from the rule runs so the
/// snapshot never recomputes what was actually judged.
pub fn snapshot_evidence(
    attempt: &CheckInAttempt,
    event: &Event,
    distance_km: Option<f64>,
    minutes_from_start: Option<f64>,
) -> EvidenceSnapshot {
    EvidenceSnapshot {
        user_location: attempt.coordinates,
        event_location: event.location,
        distance_km,
        qr_scan_at: attempt.qr_scan_at,
        event_starts_at: event.starts_at,
        event_ends_at: event.ends_at,
        minutes_from_start,
        device_hash: attempt.device_hash.clone(),
        device_os: attempt.device_os.clone(),
        app_instance_id: attempt.app_instance_id.clone(),
        host_confirmed: attempt.host_confirmed,
    }
}

/// Build the immutable decision record. Unlock flags all follow the
/// classification; only a later support correction may move them.
pub fn build_record(
    id: VerificationId,
    user_id: UserId,
    event_id: EventId,
    verdict: &Verdict,
    signals: Vec<Signal>,
    evidence: EvidenceSnapshot,
    now: Timestamp,
) -> VerificationRecord {
    let unlocked = verdict.classification.unlocks_attendance();
    VerificationRecord {
        id,
        user_id,
        event_id,
        classification: verdict.classification,
        risk_score: verdict.risk_score,
        action: verdict.action,
        signals,
        evidence,
        rewards_unlocked: unlocked,
        reviews_unlocked: unlocked,
        escrow_released: unlocked,
        model_version: MODEL_VERSION.to_string(),
        created_at: now,
        support_decision: None,
        support_decision_at: None,
        support_notes: None,
    }
}

/// Build the scan-log entry appended for every attempt, rejected ones
/// included. `scanned_at` is the server-observed decision time; replay
/// windows must not run on client claims.
pub fn build_scan_log(
    attempt: &CheckInAttempt,
    user_id: UserId,
    event_id: EventId,
    classification: Classification,
    now: Timestamp,
) -> QrScanLog {
    let is_valid = classification != Classification::Fraudulent;
    QrScanLog {
        qr_code_hash: QrHash::from_scan(&attempt.qr_code),
        event_id,
        user_id,
        device_hash: attempt.device_hash.clone(),
        scanned_at: now,
        is_valid,
        rejection_reason: (!is_valid).then(|| "verification_failed".to_string()),
    }
}

/// Patch a record with a support ruling. Confirmed rulings move all three
/// unlock flags together; inconclusive only stamps the review.
pub fn apply_support_decision(
    mut record: VerificationRecord,
    decision: SupportDecision,
    notes: Option<String>,
    now: Timestamp,
) -> VerificationRecord {
    record.support_decision = Some(decision);
    record.support_decision_at = Some(now);
    record.support_notes = notes;

    match decision {
        SupportDecision::ConfirmedValid => {
            record.rewards_unlocked = true;
            record.reviews_unlocked = true;
            record.escrow_released = true;
        }
        SupportDecision::ConfirmedFraud => {
            record.rewards_unlocked = false;
            record.reviews_unlocked = false;
            record.escrow_released = false;
        }
        SupportDecision::Inconclusive => {}
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatecheck_types::{GeoPoint, HostId, VerdictAction};

    fn sample_event() -> Event {
        Event {
            id: EventId::new(42),
            host_id: HostId::new(3),
            location: Some(GeoPoint::new(52.52, 13.405)),
            starts_at: Some(Timestamp::new(100_000)),
            ends_at: Some(Timestamp::new(110_000)),
        }
    }

    fn suspicious_verdict() -> Verdict {
        Verdict {
            classification: Classification::Suspicious,
            action: VerdictAction::Restrict,
            risk_score: 0.5,
        }
    }

    #[test]
    fn evidence_carries_attempt_and_event_sides() {
        let mut attempt = CheckInAttempt::bare("TICKET");
        attempt.coordinates = Some(GeoPoint::new(52.0, 13.0));
        attempt.device_os = Some("android-14".into());
        attempt.host_confirmed = Some(false);

        let evidence = snapshot_evidence(&attempt, &sample_event(), Some(3.4), Some(12.0));
        assert_eq!(evidence.user_location, Some(GeoPoint::new(52.0, 13.0)));
        assert_eq!(evidence.event_location, Some(GeoPoint::new(52.52, 13.405)));
        assert_eq!(evidence.distance_km, Some(3.4));
        assert_eq!(evidence.event_starts_at, Some(Timestamp::new(100_000)));
        assert_eq!(evidence.minutes_from_start, Some(12.0));
        assert_eq!(evidence.device_os.as_deref(), Some("android-14"));
        assert_eq!(evidence.host_confirmed, Some(false));
        assert!(evidence.qr_scan_at.is_none());
    }

    #[test]
    fn record_unlocks_follow_the_classification() {
        let record = build_record(
            VerificationId::new(1),
            UserId::new(7),
            EventId::new(42),
            &suspicious_verdict(),
            Vec::new(),
            EvidenceSnapshot::default(),
            Timestamp::new(100_000),
        );
        assert!(!record.rewards_unlocked);
        assert!(!record.reviews_unlocked);
        assert!(!record.escrow_released);
        assert_eq!(record.model_version, MODEL_VERSION);
        assert!(record.support_decision.is_none());
    }

    #[test]
    fn fraudulent_scan_log_carries_the_rejection_reason() {
        let attempt = CheckInAttempt::bare("TICKET-9");
        let log = build_scan_log(
            &attempt,
            UserId::new(7),
            EventId::new(42),
            Classification::Fraudulent,
            Timestamp::new(100_000),
        );
        assert!(!log.is_valid);
        assert_eq!(log.rejection_reason.as_deref(), Some("verification_failed"));
        assert_eq!(log.scanned_at, Timestamp::new(100_000));

        let log = build_scan_log(
            &attempt,
            UserId::new(7),
            EventId::new(42),
            Classification::Suspicious,
            Timestamp::new(100_000),
        );
        assert!(log.is_valid);
        assert!(log.rejection_reason.is_none());
    }

    #[test]
    fn support_patch_moves_all_unlocks_together() {
        let record = build_record(
            VerificationId::new(1),
            UserId::new(7),
            EventId::new(42),
            &suspicious_verdict(),
            Vec::new(),
            EvidenceSnapshot::default(),
            Timestamp::new(100_000),
        );

        let patched = apply_support_decision(
            record.clone(),
            SupportDecision::ConfirmedValid,
            Some("attendee sent venue photos".into()),
            Timestamp::new(101_000),
        );
        assert!(patched.rewards_unlocked && patched.reviews_unlocked && patched.escrow_released);
        assert_eq!(patched.support_decision, Some(SupportDecision::ConfirmedValid));
        assert_eq!(patched.support_decision_at, Some(Timestamp::new(101_000)));

        let patched = apply_support_decision(
            patched,
            SupportDecision::ConfirmedFraud,
            None,
            Timestamp::new(102_000),
        );
        assert!(!patched.rewards_unlocked && !patched.reviews_unlocked && !patched.escrow_released);
    }

    #[test]
    fn inconclusive_patch_only_stamps_the_review() {
        let record = build_record(
            VerificationId::new(1),
            UserId::new(7),
            EventId::new(42),
            &suspicious_verdict(),
            Vec::new(),
            EvidenceSnapshot::default(),
            Timestamp::new(100_000),
        );
        let unlocked_before = record.rewards_unlocked;

        let patched = apply_support_decision(
            record,
            SupportDecision::Inconclusive,
            None,
            Timestamp::new(101_000),
        );
        assert_eq!(patched.rewards_unlocked, unlocked_before);
        assert_eq!(patched.support_decision, Some(SupportDecision::Inconclusive));
    }
}
