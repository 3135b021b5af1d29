//! Temporal rules: scan timing relative to event start.

use gatecheck_types::{EngineParams, Signal, SignalKind, Timestamp};

/// Outcome of the scan-timing rule.
pub struct TimingCheck {
    pub signal: Option<Signal>,
    /// Signed offset of the scan from event start, in minutes. Carried on
    /// the audit record whether or not a signal fired; `None` when the
    /// attempt carried no scan-time claim.
    pub minutes_from_start: Option<f64>,
}

impl TimingCheck {
    fn abstain() -> Self {
        Self {
            signal: None,
            minutes_from_start: None,
        }
    }
}

/// Scan-timing rule. Judges the client-claimed scan time against event
/// start; an attempt without a claim abstains, since the server-observed
/// time says when the request arrived, not when the code was scanned.
/// An event without a start time abstains too.
///
/// Timing outside the window only grades severity, it never hard-fails:
/// clock skew and late arrivals are common at real events.
pub fn check_timing(
    scan_at: Option<Timestamp>,
    starts_at: Option<Timestamp>,
    params: &EngineParams,
) -> TimingCheck {
    let (Some(scan_at), Some(starts_at)) = (scan_at, starts_at) else {
        return TimingCheck::abstain();
    };

    let delta_secs = scan_at.signed_secs_since(starts_at);

    let signal = if delta_secs < params.qr_early_cutoff_secs {
        Some(Signal::fixed(SignalKind::EarlyQrScan))
    } else if delta_secs > params.qr_very_late_cutoff_secs {
        Some(Signal::fixed(SignalKind::VeryLateQrScan))
    } else if delta_secs > params.qr_late_cutoff_secs {
        Some(Signal::fixed(SignalKind::LateQrScan))
    } else {
        None
    };

    TimingCheck {
        signal,
        minutes_from_start: Some(delta_secs as f64 / 60.0),
    }
}
