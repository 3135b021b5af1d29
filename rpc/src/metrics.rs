//! Prometheus metrics for the verification engine.
//!
//! [`EngineMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

use gatecheck_engine::{SupportOutcome, VerificationOutcome};
use gatecheck_types::{Classification, SupportDecision};

/// Central collection of engine-level Prometheus metrics.
pub struct EngineMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total check-in attempts handled, decided or failed.
    pub verifications_total: IntCounter,
    /// Attempts classified Valid.
    pub verifications_valid: IntCounter,
    /// Attempts classified Suspicious.
    pub verifications_suspicious: IntCounter,
    /// Attempts classified Fraudulent.
    pub verifications_fraudulent: IntCounter,
    /// Attempts that failed before a decision committed.
    pub verifications_failed: IntCounter,
    /// Decisions carrying at least one hard-fraud signal.
    pub hard_fraud_signals: IntCounter,
    /// Support rulings recorded.
    pub support_decisions: IntCounter,
    /// Support rulings that overturned the original unlock state.
    pub support_overturns: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// End-to-end verify handler latency, in milliseconds.
    pub verify_latency_ms: Histogram,
}

impl EngineMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let verifications_total = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_verifications_total",
                "Total check-in attempts handled"
            ),
            registry
        )
        .expect("failed to register verifications_total counter");

        let verifications_valid = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_verifications_valid_total",
                "Attempts classified Valid"
            ),
            registry
        )
        .expect("failed to register verifications_valid counter");

        let verifications_suspicious = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_verifications_suspicious_total",
                "Attempts classified Suspicious"
            ),
            registry
        )
        .expect("failed to register verifications_suspicious counter");

        let verifications_fraudulent = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_verifications_fraudulent_total",
                "Attempts classified Fraudulent"
            ),
            registry
        )
        .expect("failed to register verifications_fraudulent counter");

        let verifications_failed = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_verifications_failed_total",
                "Attempts that failed before a decision committed"
            ),
            registry
        )
        .expect("failed to register verifications_failed counter");

        let hard_fraud_signals = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_hard_fraud_signals_total",
                "Decisions carrying at least one hard-fraud signal"
            ),
            registry
        )
        .expect("failed to register hard_fraud_signals counter");

        let support_decisions = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_support_decisions_total",
                "Support rulings recorded"
            ),
            registry
        )
        .expect("failed to register support_decisions counter");

        let support_overturns = register_int_counter_with_registry!(
            Opts::new(
                "gatecheck_support_overturns_total",
                "Support rulings that overturned the original verdict"
            ),
            registry
        )
        .expect("failed to register support_overturns counter");

        // Exponential buckets covering 0.1 ms → ~1.6 s.
        let verify_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "gatecheck_verify_latency_ms",
                "Verify handler latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.1, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register verify_latency_ms histogram");

        Self {
            registry,
            verifications_total,
            verifications_valid,
            verifications_suspicious,
            verifications_fraudulent,
            verifications_failed,
            hard_fraud_signals,
            support_decisions,
            support_overturns,
            verify_latency_ms,
        }
    }

    /// Count one decided attempt.
    pub fn observe_outcome(&self, outcome: &VerificationOutcome) {
        self.verifications_total.inc();
        match outcome.classification {
            Classification::Valid => self.verifications_valid.inc(),
            Classification::Suspicious => self.verifications_suspicious.inc(),
            Classification::Fraudulent => self.verifications_fraudulent.inc(),
        }
        if outcome.signals.iter().any(|s| s.is_hard_fraud()) {
            self.hard_fraud_signals.inc();
        }
    }

    /// Count one attempt that failed before any decision committed.
    pub fn observe_failure(&self) {
        self.verifications_total.inc();
        self.verifications_failed.inc();
    }

    /// Count one support ruling.
    pub fn observe_support(&self, outcome: &SupportOutcome) {
        self.support_decisions.inc();
        if !matches!(outcome.decision, SupportDecision::Inconclusive) {
            self.support_overturns.inc();
        }
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %err, "metrics encoding failed");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatecheck_types::{Signal, SignalKind, VerificationId};

    fn outcome(classification: Classification, signals: Vec<Signal>) -> VerificationOutcome {
        VerificationOutcome {
            verification_id: VerificationId::new(1),
            classification,
            risk_score: 0.0,
            signals,
            action: classification.action(),
            rewards_unlocked: classification.unlocks_attendance(),
            reviews_unlocked: classification.unlocks_attendance(),
            escrow_released: classification.unlocks_attendance(),
        }
    }

    #[test]
    fn outcomes_split_by_classification() {
        let metrics = EngineMetrics::new();
        metrics.observe_outcome(&outcome(Classification::Valid, vec![]));
        metrics.observe_outcome(&outcome(
            Classification::Fraudulent,
            vec![Signal::fixed(SignalKind::QrReplayDetected)],
        ));
        metrics.observe_failure();

        assert_eq!(metrics.verifications_total.get(), 3);
        assert_eq!(metrics.verifications_valid.get(), 1);
        assert_eq!(metrics.verifications_fraudulent.get(), 1);
        assert_eq!(metrics.verifications_failed.get(), 1);
        assert_eq!(metrics.hard_fraud_signals.get(), 1);
    }

    #[test]
    fn inconclusive_rulings_do_not_count_as_overturns() {
        let metrics = EngineMetrics::new();
        for decision in [
            SupportDecision::ConfirmedValid,
            SupportDecision::Inconclusive,
        ] {
            metrics.observe_support(&SupportOutcome {
                verification_id: VerificationId::new(1),
                decision,
                rewards_unlocked: false,
                reviews_unlocked: false,
                escrow_released: false,
            });
        }
        assert_eq!(metrics.support_decisions.get(), 2);
        assert_eq!(metrics.support_overturns.get(), 1);
    }

    #[test]
    fn exposition_text_carries_metric_names() {
        let metrics = EngineMetrics::new();
        metrics.observe_failure();
        let text = metrics.encode();
        assert!(text.contains("gatecheck_verifications_total 1"));
        assert!(text.contains("gatecheck_verify_latency_ms"));
    }
}
