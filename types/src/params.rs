//! Engine parameters — every tunable threshold in one place.
//!
//! Rule code never embeds a literal threshold; it reads from this struct.
//! Deployments override individual fields through the daemon's TOML config;
//! anything left unset keeps the documented default.

use serde::{Deserialize, Serialize};

/// All tunable thresholds of the verification engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    // ── Geospatial ───────────────────────────────────────────────────────
    /// Maximum distance (km) between check-in coordinates and the venue
    /// before a GPS mismatch fires. Default: 2.0.
    pub gps_max_distance_km: f64,

    /// Jump distance (km) from the previous check-in that counts as
    /// physically implausible within the spoof window. Default: 50.0.
    pub gps_spoof_jump_km: f64,

    /// Window (seconds) in which such a jump is implausible.
    /// Default: 3600 (1 hour).
    pub gps_spoof_window_secs: u64,

    // ── Temporal ─────────────────────────────────────────────────────────
    /// Earliest accepted scan, relative to event start (seconds, negative =
    /// before start). Default: -600 (10 minutes early).
    pub qr_early_cutoff_secs: i64,

    /// Scans later than this after start are late. Default: 2700 (45 min).
    pub qr_late_cutoff_secs: i64,

    /// Scans later than this after start are very late. Default: 7200 (2 h).
    pub qr_very_late_cutoff_secs: i64,

    // ── Replay ───────────────────────────────────────────────────────────
    /// Window (seconds) within which a repeated QR hash at the same event
    /// counts as a replay. Default: 60.
    pub qr_replay_window_secs: u64,

    // ── Device ───────────────────────────────────────────────────────────
    /// Distinct users allowed per device fingerprint before it counts as
    /// shared. Default: 3.
    pub max_users_per_device: usize,

    /// Distinct devices a user may appear on inside the simultaneous-use
    /// window before it counts as device hopping. Default: 2.
    pub max_simultaneous_devices: usize,

    /// The simultaneous-use window (seconds). Default: 1800 (30 minutes).
    pub device_simultaneous_window_secs: u64,

    // ── Host attestation ─────────────────────────────────────────────────
    /// Host rating above which a denial is treated as a reliable conflict
    /// rather than a soft non-confirmation. Default: 4.0.
    pub reliable_host_rating: f64,

    // ── Trust ledger ─────────────────────────────────────────────────────
    /// Trust score below this line signals prior fraud. Default: 0.3.
    pub trust_fraud_threshold: f64,

    /// Trust score below this line (but at or above the fraud line)
    /// signals low trust. Default: 0.6.
    pub trust_low_threshold: f64,

    /// Trust restored by a Valid verification. Default: 0.02.
    pub trust_reward_valid: f64,

    /// Trust deducted by a Suspicious verification. Default: 0.05.
    pub trust_penalty_suspicious: f64,

    /// Trust deducted by a Fraudulent verification. Default: 0.15.
    pub trust_penalty_fraudulent: f64,

    /// Trust restored when support confirms a check-in was genuine.
    /// Default: 0.10.
    pub trust_restore_confirmed_valid: f64,

    /// Trust deducted when support confirms fraud. Default: 0.25.
    pub trust_penalty_confirmed_fraud: f64,

    // ── Risk fusion ──────────────────────────────────────────────────────
    /// Weight of the distrust amplifier applied to the severity sum:
    /// `risk = sum * (1 + (1 - trust) * weight)`. Default: 0.3.
    pub trust_risk_weight: f64,

    /// Risk at or below this is Valid. Default: 0.3.
    pub risk_valid_max: f64,

    /// Risk at or below this (but above the valid ceiling) is Suspicious;
    /// anything higher is Fraudulent. Default: 0.7.
    pub risk_suspicious_max: f64,

    // ── History ──────────────────────────────────────────────────────────
    /// Records returned by a history query when no limit is given.
    /// Default: 50.
    pub history_default_limit: usize,

    /// Hard ceiling on a single history query. Default: 500.
    pub history_max_limit: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            gps_max_distance_km: 2.0,
            gps_spoof_jump_km: 50.0,
            gps_spoof_window_secs: 3600,

            qr_early_cutoff_secs: -600,
            qr_late_cutoff_secs: 45 * 60,
            qr_very_late_cutoff_secs: 2 * 3600,

            qr_replay_window_secs: 60,

            max_users_per_device: 3,
            max_simultaneous_devices: 2,
            device_simultaneous_window_secs: 30 * 60,

            reliable_host_rating: 4.0,

            trust_fraud_threshold: 0.3,
            trust_low_threshold: 0.6,
            trust_reward_valid: 0.02,
            trust_penalty_suspicious: 0.05,
            trust_penalty_fraudulent: 0.15,
            trust_restore_confirmed_valid: 0.10,
            trust_penalty_confirmed_fraud: 0.25,

            trust_risk_weight: 0.3,
            risk_valid_max: 0.3,
            risk_suspicious_max: 0.7,

            history_default_limit: 50,
            history_max_limit: 500,
        }
    }
}
