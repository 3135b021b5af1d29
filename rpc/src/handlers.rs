//! Request and response bodies, and their conversions.
//!
//! The engine's outcome types never cross the wire directly; everything is
//! flattened into explicit DTOs here so the HTTP contract survives internal
//! refactors.

use serde::{Deserialize, Serialize};

use gatecheck_engine::{CheckInAttempt, EngineError, SupportOutcome, VerificationOutcome};
use gatecheck_store::{HistoryFilter, VerificationRecord};
use gatecheck_types::{
    Classification, EventId, GeoPoint, Signal, SupportDecision, Timestamp, UserId, VerdictAction,
    MODEL_VERSION,
};

// ── Verify ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub user_id: u64,
    pub event_id: u64,
    /// Raw QR payload, or an already-hashed token.
    pub qr_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Client-claimed scan time, Unix seconds.
    pub qr_timestamp: Option<u64>,
    pub device_hash: Option<String>,
    pub device_os: Option<String>,
    pub app_instance_id: Option<String>,
    pub host_confirmed: Option<bool>,
}

impl VerifyRequest {
    /// The attempt this request describes. Coordinates require both axes;
    /// a lone latitude or longitude is treated as absent.
    pub fn attempt(&self) -> CheckInAttempt {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        CheckInAttempt {
            coordinates,
            qr_code: self.qr_code.clone(),
            qr_scan_at: self.qr_timestamp.map(Timestamp::new),
            device_hash: self.device_hash.clone(),
            device_os: self.device_os.clone(),
            app_instance_id: self.app_instance_id.clone(),
            host_confirmed: self.host_confirmed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerificationReport {
    /// `Valid`, `Suspicious`, `Fraudulent`, or `Error` when no decision
    /// could be committed.
    pub check_in_status: String,
    pub risk_score: f64,
    pub signals: Vec<Signal>,
    pub action: VerdictAction,
    pub rewards_unlocked: bool,
    pub reviews_unlocked: bool,
    pub escrow_released: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<u64>,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationReport {
    /// Report for a decided attempt.
    pub fn from_outcome(outcome: &VerificationOutcome) -> Self {
        Self {
            check_in_status: outcome.classification.to_string(),
            risk_score: outcome.risk_score,
            signals: outcome.signals.clone(),
            action: outcome.action,
            rewards_unlocked: outcome.rewards_unlocked,
            reviews_unlocked: outcome.reviews_unlocked,
            escrow_released: outcome.escrow_released,
            verification_id: Some(outcome.verification_id.as_u64()),
            model_version: MODEL_VERSION.to_string(),
            error: None,
        }
    }

    /// Fail-closed report: no decision was committed, nothing unlocks, and
    /// the attempt goes to support.
    pub fn failure(err: &EngineError) -> Self {
        Self {
            check_in_status: "Error".to_string(),
            risk_score: 1.0,
            signals: Vec::new(),
            action: VerdictAction::EscalateToSupport,
            rewards_unlocked: false,
            reviews_unlocked: false,
            escrow_released: false,
            verification_id: None,
            model_version: MODEL_VERSION.to_string(),
            error: Some(err.to_string()),
        }
    }
}

// ── Support decision ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SupportDecisionRequest {
    pub verification_id: u64,
    /// Rejected by serde before any state is touched when the value is not
    /// a known ruling.
    pub decision: SupportDecision,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SupportDecisionResponse {
    pub verification_id: u64,
    pub decision: SupportDecision,
    pub rewards_unlocked: bool,
    pub reviews_unlocked: bool,
    pub escrow_released: bool,
}

impl SupportDecisionResponse {
    pub fn from_outcome(outcome: &SupportOutcome) -> Self {
        Self {
            verification_id: outcome.verification_id.as_u64(),
            decision: outcome.decision,
            rewards_unlocked: outcome.rewards_unlocked,
            reviews_unlocked: outcome.reviews_unlocked,
            escrow_released: outcome.escrow_released,
        }
    }
}

// ── History ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<u64>,
    pub event_id: Option<u64>,
    /// `Valid`, `Suspicious`, or `Fraudulent`.
    pub status: Option<Classification>,
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn filter(&self) -> HistoryFilter {
        HistoryFilter {
            user_id: self.user_id.map(UserId::new),
            event_id: self.event_id.map(EventId::new),
            classification: self.status,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub total: usize,
    pub records: Vec<HistoryEntry>,
}

impl HistoryResponse {
    pub fn from_records(records: &[VerificationRecord]) -> Self {
        Self {
            total: records.len(),
            records: records.iter().map(HistoryEntry::from_record).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub verification_id: u64,
    pub user_id: u64,
    pub event_id: u64,
    pub check_in_status: String,
    pub risk_score: f64,
    pub action: VerdictAction,
    pub signals: Vec<Signal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_decision: Option<SupportDecision>,
}

impl HistoryEntry {
    pub fn from_record(record: &VerificationRecord) -> Self {
        Self {
            verification_id: record.id.as_u64(),
            user_id: record.user_id.as_u64(),
            event_id: record.event_id.as_u64(),
            check_in_status: record.classification.to_string(),
            risk_score: record.risk_score,
            action: record.action,
            signals: record.signals.clone(),
            distance_km: record.evidence.distance_km,
            created_at: record.created_at.as_secs(),
            support_decision: record.support_decision,
        }
    }
}

// ── Health ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_version: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            model_version: MODEL_VERSION,
        }
    }
}
