//! Replay guard: the same QR payload scanned twice in quick succession.

use gatecheck_store::QrScanLog;
use gatecheck_types::{EngineParams, Signal, SignalKind, Timestamp};

/// Replay rule. `latest` is the most recent logged scan of this QR hash at
/// this event, regardless of which user presented it. Fires when that scan
/// is closer than the replay window, whoever scanned it.
pub fn check_replay(
    latest: Option<&QrScanLog>,
    now: Timestamp,
    params: &EngineParams,
) -> Option<Signal> {
    let latest = latest?;
    let elapsed = latest.scanned_at.elapsed_since(now);
    (elapsed < params.qr_replay_window_secs)
        .then(|| Signal::fixed(SignalKind::QrReplayDetected))
}
