//! Geographic coordinates and great-circle distance.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::DomainError;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated WGS84 coordinate.
///
/// Latitude is within `[-90, 90]`, longitude within `[-180, 180]`, and both
/// are finite. Any `LatLng` value is valid by construction.
///
/// # Examples
///
/// ```
/// use facility_server::domain::LatLng;
///
/// let tokyo = LatLng::new(35.681236, 139.767125).unwrap();
/// assert_eq!(tokyo.lat(), 35.681236);
///
/// assert!(LatLng::new(91.0, 0.0).is_err());
/// assert!(LatLng::new(f64::NAN, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    lat: f64,
    lng: f64,
}

impl LatLng {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::InvalidCoordinate("latitude out of range"));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(DomainError::InvalidCoordinate("longitude out of range"));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle distance to another coordinate in kilometres.
    pub fn distance_km(&self, other: &LatLng) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

impl FromStr for LatLng {
    type Err = DomainError;

    /// Parse `"lat,lng"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or(DomainError::InvalidCoordinate("expected \"lat,lng\""))?;
        let lat = lat
            .trim()
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidCoordinate("latitude is not a number"))?;
        let lng = lng
            .trim()
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidCoordinate("longitude is not a number"))?;
        Self::new(lat, lng)
    }
}

/// Haversine distance in kilometres between two lat/lng pairs in degrees.
///
/// ```text
/// a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlng/2)
/// d = 2 · R · atan2(√a, √(1−a))
/// ```
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Geographic bounding box used as a sanity guard during ingestion.
///
/// Rows whose coordinates fall outside the service region are almost always
/// the result of spreadsheet column drift, not real facilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// The Japanese archipelago, including outlying islands.
    pub fn japan() -> Self {
        Self::new(20.0, 46.0, 122.0, 154.0)
    }

    /// Check whether a coordinate lies inside the box (edges inclusive).
    pub fn contains(&self, point: &LatLng) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat())
            && (self.min_lng..=self.max_lng).contains(&point.lng())
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::japan()
    }
}
