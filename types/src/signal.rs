//! Fraud signals and the fixed severity table.
//!
//! The signal set is closed: evaluators can only raise kinds listed here,
//! and each kind's weight comes from one table instead of being scattered
//! through rule code. Adding a rule means adding a variant, which forces
//! every exhaustive match in the engine to be revisited.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every fraud signal the engine can raise, in fixed evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Check-in coordinates outside the allowed radius around the venue.
    GpsMismatch,
    /// Implausibly fast jump from the user's previous check-in location.
    GpsSpoofDetected,
    /// QR scanned before the early-entry window opened.
    EarlyQrScan,
    /// QR scanned well after the event started.
    LateQrScan,
    /// QR scanned hours after the event started.
    VeryLateQrScan,
    /// Same QR hash seen at this event within the replay window.
    QrReplayDetected,
    /// Device fingerprint shared by too many distinct users.
    DeviceSharedMultipleUsers,
    /// User hopped across too many devices in a short window.
    DeviceSimultaneous,
    /// Device fingerprint previously flagged by an operator.
    DeviceFlagged,
    /// Host explicitly denied seeing this attendee.
    HostNotConfirmed,
    /// Reliable host (high rating) denied seeing this attendee.
    HostConflict,
    /// User's trust score is below the low-trust line.
    UserLowTrust,
    /// User's trust score is below the prior-fraud line.
    UserPriorFraud,
}

impl SignalKind {
    /// Severity contributed when this signal fires.
    ///
    /// `None` only for [`SignalKind::GpsMismatch`], whose severity is graded
    /// by distance at evaluation time. Every other kind has a fixed weight.
    pub fn fixed_severity(&self) -> Option<f64> {
        match self {
            Self::GpsMismatch => None,
            Self::GpsSpoofDetected => Some(0.8),
            Self::EarlyQrScan => Some(0.15),
            Self::LateQrScan => Some(0.2),
            Self::VeryLateQrScan => Some(0.5),
            Self::QrReplayDetected => Some(0.9),
            Self::DeviceSharedMultipleUsers => Some(0.4),
            Self::DeviceSimultaneous => Some(0.5),
            Self::DeviceFlagged => Some(0.6),
            Self::HostNotConfirmed => Some(0.15),
            Self::HostConflict => Some(0.5),
            Self::UserLowTrust => Some(0.3),
            Self::UserPriorFraud => Some(0.6),
        }
    }

    /// Whether this signal alone forces a `Fraudulent` classification,
    /// bypassing the weighted risk sum.
    pub fn is_hard_fraud(&self) -> bool {
        matches!(
            self,
            Self::QrReplayDetected | Self::GpsSpoofDetected | Self::DeviceFlagged
        )
    }

    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GpsMismatch => "gps_mismatch",
            Self::GpsSpoofDetected => "gps_spoof_detected",
            Self::EarlyQrScan => "early_qr_scan",
            Self::LateQrScan => "late_qr_scan",
            Self::VeryLateQrScan => "very_late_qr_scan",
            Self::QrReplayDetected => "qr_replay_detected",
            Self::DeviceSharedMultipleUsers => "device_shared_multiple_users",
            Self::DeviceSimultaneous => "device_simultaneous",
            Self::DeviceFlagged => "device_flagged",
            Self::HostNotConfirmed => "host_not_confirmed",
            Self::HostConflict => "host_conflict",
            Self::UserLowTrust => "user_low_trust",
            Self::UserPriorFraud => "user_prior_fraud",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A triggered signal with its effective severity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub severity: f64,
}

impl Signal {
    /// A signal carrying its kind's fixed table severity.
    ///
    /// # Panics
    ///
    /// Panics if called with [`SignalKind::GpsMismatch`], the one kind whose
    /// severity is graded at evaluation time; use [`Signal::graded`] for it.
    pub fn fixed(kind: SignalKind) -> Self {
        let severity = kind
            .fixed_severity()
            .expect("signal kind has a fixed severity");
        Self { kind, severity }
    }

    /// A signal with an evaluation-time severity.
    pub fn graded(kind: SignalKind, severity: f64) -> Self {
        Self { kind, severity }
    }

    pub fn is_hard_fraud(&self) -> bool {
        self.kind.is_hard_fraud()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:.2})", self.kind, self.severity)
    }
}
