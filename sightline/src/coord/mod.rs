//! Geographic coordinate types and distance math.
//!
//! Provides the validated WGS84 [`Coordinate`] type used throughout the crate
//! and the great-circle distance underlying radius queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Mean Earth radius in kilometers (IUGG).
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Default radius for viewport queries, in kilometers.
pub const DEFAULT_QUERY_RADIUS_KM: f64 = 2.5;

/// Errors produced by coordinate validation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the valid -90..=90 degree range.
    #[error("invalid latitude: {0} (expected -90..=90)")]
    InvalidLatitude(f64),

    /// Longitude outside the valid -180..=180 degree range.
    #[error("invalid longitude: {0} (expected -180..=180)")]
    InvalidLongitude(f64),
}

/// A geographic position in floating-point degrees.
///
/// Construct via [`Coordinate::new`] to get range validation. Fields are
/// public because positions arriving over the store's wire boundary were
/// validated at write time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl Coordinate {
    /// Create a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError`] if either component is outside its valid range
    /// or is not a finite number.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordError> {
        if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Great-circle distance to another coordinate, in kilometers.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self, other)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Haversine great-circle distance between two coordinates, in kilometers.
///
/// Accurate to well under the query radius granularity this crate cares
/// about; no ellipsoidal correction is applied.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    // Clamp against float error pushing h past 1 for near-antipodal pairs.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}
