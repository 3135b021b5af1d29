//! Geospatial rules: venue distance and spoof jumps.

use gatecheck_store::VerificationRecord;
use gatecheck_types::{EngineParams, GeoPoint, Signal, SignalKind, Timestamp};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Outcome of the venue-distance rule.
pub struct DistanceCheck {
    pub signal: Option<Signal>,
    /// Computed whenever both coordinates are present, signal or not,
    /// so the audit record always carries it.
    pub distance_km: Option<f64>,
}

/// Venue-distance rule. Abstains when either coordinate is missing.
///
/// Severity grows linearly with distance and caps at 10 km, so a scan from
/// across town and a scan from another country read the same.
pub fn check_distance(
    user: Option<GeoPoint>,
    venue: Option<GeoPoint>,
    params: &EngineParams,
) -> DistanceCheck {
    let (Some(user), Some(venue)) = (user, venue) else {
        return DistanceCheck {
            signal: None,
            distance_km: None,
        };
    };

    let distance_km = haversine_km(user, venue);
    let signal = (distance_km > params.gps_max_distance_km).then(|| {
        Signal::graded(SignalKind::GpsMismatch, (distance_km / 10.0).min(1.0))
    });

    DistanceCheck {
        signal,
        distance_km: Some(distance_km),
    }
}

/// Spoof-jump rule: a user cannot be 50 km from their previous check-in
/// within the hour. Compares against the previous record's *decision* time,
/// since client scan claims are not trustworthy here.
///
/// Abstains when there is no prior record, the prior record carried no
/// coordinates, or the current attempt has none.
pub fn check_spoof(
    prior: Option<&VerificationRecord>,
    current: Option<GeoPoint>,
    now: Timestamp,
    params: &EngineParams,
) -> Option<Signal> {
    let prior = prior?;
    let previous = prior.evidence.user_location?;
    let current = current?;

    let elapsed = prior.created_at.elapsed_since(now);
    if elapsed >= params.gps_spoof_window_secs {
        return None;
    }

    let jump_km = haversine_km(previous, current);
    (jump_km > params.gps_spoof_jump_km).then(|| Signal::fixed(SignalKind::GpsSpoofDetected))
}
