//! Check-in attempt input.

use gatecheck_types::{GeoPoint, Timestamp};

/// Everything a client submits with one check-in claim.
///
/// Never persisted as-is; the engine freezes what it used into the
/// verification record's evidence snapshot. Every field except the QR
/// payload is optional, and each rule abstains when its inputs are absent.
#[derive(Clone, Debug)]
pub struct CheckInAttempt {
    /// Claimed GPS position at scan time.
    pub coordinates: Option<GeoPoint>,
    /// Raw QR payload or an already-hashed token.
    pub qr_code: String,
    /// Client-claimed scan time. Compared against the event schedule only;
    /// replay windows use server-observed time.
    pub qr_scan_at: Option<Timestamp>,
    pub device_hash: Option<String>,
    pub device_os: Option<String>,
    pub app_instance_id: Option<String>,
    /// Tri-state host attestation: absent means the host was never asked.
    pub host_confirmed: Option<bool>,
}

impl CheckInAttempt {
    /// An attempt carrying nothing but the QR payload.
    pub fn bare(qr_code: impl Into<String>) -> Self {
        Self {
            coordinates: None,
            qr_code: qr_code.into(),
            qr_scan_at: None,
            device_hash: None,
            device_os: None,
            app_instance_id: None,
            host_confirmed: None,
        }
    }
}
