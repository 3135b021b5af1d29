//! Risk fusion: signals plus trust in, one verdict out.

use gatecheck_types::{Classification, EngineParams, Signal, VerdictAction};

/// The fused decision for one attempt.
#[derive(Clone, Debug)]
pub struct Verdict {
    pub classification: Classification,
    pub action: VerdictAction,
    pub risk_score: f64,
}

/// Fuse the collected signals and the user's trust score into a verdict.
///
/// A hard-fraud signal is definitive: the verdict is Fraudulent at risk
/// 1.0 with no numeric fusion at all. Otherwise risk is the severity sum
/// amplified by distrust, capped at 1.0, and the classification falls out
/// of the two thresholds.
pub fn fuse(signals: &[Signal], trust: f64, params: &EngineParams) -> Verdict {
    if signals.iter().any(|s| s.is_hard_fraud()) {
        return Verdict {
            classification: Classification::Fraudulent,
            action: Classification::Fraudulent.action(),
            risk_score: 1.0,
        };
    }

    let severity_sum: f64 = signals.iter().map(|s| s.severity).sum();
    let trust_modifier = 1.0 + (1.0 - trust) * params.trust_risk_weight;
    let risk_score = (severity_sum * trust_modifier).min(1.0);

    let classification = if risk_score <= params.risk_valid_max {
        Classification::Valid
    } else if risk_score <= params.risk_suspicious_max {
        Classification::Suspicious
    } else {
        Classification::Fraudulent
    };

    Verdict {
        classification,
        action: classification.action(),
        risk_score,
    }
}
