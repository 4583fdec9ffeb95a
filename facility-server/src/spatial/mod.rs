//! Grid-bucketed spatial index for radius queries.
//!
//! Facilities are bucketed into fixed-size lat/lng cells once, when the
//! facility set is loaded. A radius query scans only the cells that can
//! contain a match, then applies the exact haversine distance to each
//! facility it finds. The coarse phase over-scans a little; the exact phase
//! guarantees nothing beyond the radius leaks through.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Facility, LatLng};

/// Approximate kilometres per degree of latitude.
const KM_PER_DEGREE: f64 = 111.0;

/// Smallest cosine used when widening the longitude scan near the poles.
const MIN_LNG_SCALE: f64 = 0.01;

/// Grid cell key: (latitude cell, longitude cell).
pub type CellKey = (i64, i64);

/// A facility found by a radius query.
#[derive(Debug, Clone)]
pub struct Nearby {
    pub facility: Arc<Facility>,
    /// Straight-line (haversine) distance from the query point.
    pub distance_km: f64,
}

/// Bucket statistics, for diagnosing skewed distributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexStats {
    pub cell_count: usize,
    pub facility_count: usize,
    pub max_bucket: usize,
    pub mean_bucket: f64,
}

/// Immutable grid index over a facility set.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size_deg: f64,
    cells: HashMap<CellKey, Vec<Arc<Facility>>>,
    facility_count: usize,
}

impl SpatialIndex {
    /// Bucket every facility into the cell containing its coordinates.
    ///
    /// Facilities keep their input order within a cell, so equal-distance
    /// results come back in a stable order.
    pub fn build(facilities: &[Arc<Facility>], cell_size_deg: f64) -> Self {
        let mut cells: HashMap<CellKey, Vec<Arc<Facility>>> = HashMap::new();

        for facility in facilities {
            let key = cell_key(&facility.location, cell_size_deg);
            cells.entry(key).or_default().push(facility.clone());
        }

        Self {
            cell_size_deg,
            cells,
            facility_count: facilities.len(),
        }
    }

    /// Find facilities within `radius_km` of `origin`, nearest first.
    ///
    /// Every returned distance is `<= radius_km`. A negative or non-finite
    /// radius returns nothing.
    pub fn find_nearby(&self, origin: &LatLng, radius_km: f64) -> Vec<Nearby> {
        if self.cells.is_empty() || !radius_km.is_finite() || radius_km < 0.0 {
            return Vec::new();
        }

        let (lat_radius, lng_radius) = self.cell_radius(origin, radius_km);
        let (center_lat, center_lng) = cell_key(origin, self.cell_size_deg);

        let mut results = Vec::new();
        for y in (center_lat - lat_radius)..=(center_lat + lat_radius) {
            for x in (center_lng - lng_radius)..=(center_lng + lng_radius) {
                let Some(bucket) = self.cells.get(&(y, x)) else {
                    continue;
                };
                for facility in bucket {
                    let distance_km = origin.distance_km(&facility.location);
                    if distance_km <= radius_km {
                        results.push(Nearby {
                            facility: facility.clone(),
                            distance_km,
                        });
                    }
                }
            }
        }

        results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        results
    }

    /// Number of cells to scan in each direction around the query cell.
    ///
    /// Latitude uses `ceil(r / (111 * cell)) + 1`; the `+1` covers a query
    /// point sitting on the edge of its cell. Longitude degrees shrink with
    /// latitude, so the longitude span is widened by `1 / cos(lat)`.
    fn cell_radius(&self, origin: &LatLng, radius_km: f64) -> (i64, i64) {
        let cell_km = KM_PER_DEGREE * self.cell_size_deg;
        let lat_radius = (radius_km / cell_km).ceil() as i64 + 1;

        let scale = origin.lat().to_radians().cos().max(MIN_LNG_SCALE);
        let lng_radius = (radius_km / (cell_km * scale)).ceil() as i64 + 1;

        (lat_radius, lng_radius)
    }

    pub fn stats(&self) -> IndexStats {
        let max_bucket = self.cells.values().map(Vec::len).max().unwrap_or(0);
        let mean_bucket = if self.cells.is_empty() {
            0.0
        } else {
            self.facility_count as f64 / self.cells.len() as f64
        };

        IndexStats {
            cell_count: self.cells.len(),
            facility_count: self.facility_count,
            max_bucket,
            mean_bucket,
        }
    }

    pub fn len(&self) -> usize {
        self.facility_count
    }

    pub fn is_empty(&self) -> bool {
        self.facility_count == 0
    }
}

/// Cell containing a coordinate: `floor(coordinate / cell_size)`.
fn cell_key(point: &LatLng, cell_size_deg: f64) -> CellKey {
    (
        (point.lat() / cell_size_deg).floor() as i64,
        (point.lng() / cell_size_deg).floor() as i64,
    )
}
