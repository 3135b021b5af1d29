//! Geographic coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 coordinate pair in decimal degrees.
///
/// Coordinates arrive from mobile clients and are treated as claims, not
/// facts; the geospatial rules decide how much to trust them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
