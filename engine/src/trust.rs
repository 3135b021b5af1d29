//! Trust ledger rules: the prior-behavior signal going in, and the
//! bookkeeping folded back out after each decision.

use gatecheck_store::{TrustWrite, UserTrustProfile};
use gatecheck_types::{
    Classification, EngineParams, Signal, SignalKind, SupportDecision, Timestamp, UserId,
};

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

fn is_device_kind(kind: SignalKind) -> bool {
    matches!(
        kind,
        SignalKind::DeviceSharedMultipleUsers
            | SignalKind::DeviceSimultaneous
            | SignalKind::DeviceFlagged
    )
}

/// Prior-behavior rule. Users the ledger has never seen start at full
/// trust. Returns the trust score alongside the signal because risk
/// fusion needs the score even when no signal fires.
pub fn check_trust(
    profile: Option<&UserTrustProfile>,
    params: &EngineParams,
) -> (f64, Option<Signal>) {
    let trust = profile.map_or(UserTrustProfile::DEFAULT_TRUST, |p| p.trust_score);

    let signal = if trust < params.trust_fraud_threshold {
        Some(Signal::fixed(SignalKind::UserPriorFraud))
    } else if trust < params.trust_low_threshold {
        Some(Signal::fixed(SignalKind::UserLowTrust))
    } else {
        None
    };

    (trust, signal)
}

/// Fold a finished decision into the user's trust profile.
///
/// Takes the profile as read at the start of the attempt (or `None` for a
/// first-timer) and returns the versioned write for the commit; the store
/// rejects it if the row moved since that read.
pub fn after_decision(
    profile: Option<UserTrustProfile>,
    user_id: UserId,
    classification: Classification,
    signals: &[Signal],
    now: Timestamp,
    params: &EngineParams,
) -> TrustWrite {
    let expected_version = profile.as_ref().map(|p| p.version);
    let mut profile = profile.unwrap_or_else(|| UserTrustProfile::new(user_id, now));

    profile.total_verifications += 1;
    match classification {
        Classification::Valid => {
            profile.valid_count += 1;
            profile.trust_score = clamp01(profile.trust_score + params.trust_reward_valid);
        }
        Classification::Suspicious => {
            profile.suspicious_count += 1;
            profile.trust_score = clamp01(profile.trust_score - params.trust_penalty_suspicious);
        }
        Classification::Fraudulent => {
            profile.fraudulent_count += 1;
            profile.penalties_applied += 1;
            profile.last_penalty_at = Some(now);
            profile.trust_score = clamp01(profile.trust_score - params.trust_penalty_fraudulent);
        }
    }

    if signals.iter().any(|s| s.kind == SignalKind::GpsMismatch) {
        profile.gps_mismatch_count += 1;
    }
    if signals.iter().any(|s| s.kind == SignalKind::QrReplayDetected) {
        profile.qr_replay_count += 1;
    }
    // Counted once per verification, however many device signals fired.
    if signals.iter().any(|s| is_device_kind(s.kind)) {
        profile.device_anomaly_count += 1;
    }

    profile.last_updated = now;
    profile.version += 1;

    TrustWrite {
        profile,
        expected_version,
    }
}

/// Fold a support decision into the profile. `Inconclusive` leaves the
/// ledger untouched and returns `None`.
pub fn after_support_decision(
    profile: UserTrustProfile,
    decision: SupportDecision,
    now: Timestamp,
    params: &EngineParams,
) -> Option<TrustWrite> {
    let expected_version = Some(profile.version);
    let mut profile = profile;

    match decision {
        SupportDecision::ConfirmedValid => {
            profile.trust_score =
                clamp01(profile.trust_score + params.trust_restore_confirmed_valid);
        }
        SupportDecision::ConfirmedFraud => {
            profile.trust_score =
                clamp01(profile.trust_score - params.trust_penalty_confirmed_fraud);
            profile.penalties_applied += 1;
            profile.last_penalty_at = Some(now);
        }
        SupportDecision::Inconclusive => return None,
    }

    profile.last_updated = now;
    profile.version += 1;

    Some(TrustWrite {
        profile,
        expected_version,
    })
}
