//! Data transfer objects for web requests and responses.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{COMMON_SPECIALTIES, SPECIALTIES, SpecialtyCode, specialty_name};
use crate::planner::{
    Funnel, MatchStatus, Page, ReachabilityResult, RefineStats, SortKey, TravelEstimate,
};
use crate::repository::IngestReport;
use crate::routing::{TransitRoute, TravelLeg};
use crate::spatial::IndexStats;

/// Request to re-sort the current results.
#[derive(Debug, Deserialize)]
pub struct SortRequest {
    pub sort: SortKey,
}

/// A coordinate in responses.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

/// A specialty code with its display name, when known.
#[derive(Debug, Clone, Serialize)]
pub struct SpecialtyView {
    pub code: String,
    pub name: Option<String>,
}

impl SpecialtyView {
    pub fn from_code(code: &SpecialtyCode) -> Self {
        Self {
            code: code.as_str().to_string(),
            name: specialty_name(code).map(str::to_string),
        }
    }
}

/// Both DRIVE variants of a result.
#[derive(Debug, Serialize)]
pub struct DriveDetail {
    pub with_highways: Option<TravelLeg>,
    pub without_highways: Option<TravelLeg>,
}

/// A facility in search results.
#[derive(Debug, Serialize)]
pub struct FacilityResult {
    pub name: String,
    pub address: String,
    pub specialties: Vec<SpecialtyView>,
    pub location: Point,

    /// Straight-line distance from the origin
    pub straight_line_km: f64,

    /// Primary duration; absent when the ranking variant has no route
    pub duration_secs: Option<u64>,
    pub duration_text: Option<String>,
    pub distance_text: Option<String>,

    /// Reached by walking because transit had no route
    pub fallback: bool,

    /// Present for DRIVE results
    pub drive: Option<DriveDetail>,

    /// Step-by-step breakdown, for transit-routed results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<TransitRoute>,
}

impl FacilityResult {
    /// Create from a reachability result.
    pub fn from_result(result: &ReachabilityResult) -> Self {
        let facility = &result.facility;
        let sort_key = result.sort_key();

        let duration_text = match &result.estimate {
            TravelEstimate::Drive { with_highways, .. } => {
                with_highways.as_ref().map(|l| l.duration_text.clone())
            }
            TravelEstimate::Direct { leg } | TravelEstimate::WalkingFallback { leg } => {
                Some(leg.duration_text.clone())
            }
        };

        let drive = match &result.estimate {
            TravelEstimate::Drive {
                with_highways,
                without_highways,
            } => Some(DriveDetail {
                with_highways: with_highways.clone(),
                without_highways: without_highways.clone(),
            }),
            _ => None,
        };

        Self {
            name: facility.name.clone(),
            address: facility.address.clone(),
            specialties: facility
                .specialties
                .iter()
                .map(SpecialtyView::from_code)
                .collect(),
            location: Point {
                lat: facility.location.lat(),
                lng: facility.location.lng(),
            },
            straight_line_km: result.straight_line_km,
            duration_secs: sort_key.is_finite().then_some(sort_key as u64),
            duration_text,
            distance_text: result.distance_text().map(str::to_string),
            fallback: result.is_fallback(),
            drive,
            route: None,
        }
    }

    pub fn with_route(mut self, route: Option<TransitRoute>) -> Self {
        self.route = route;
        self
    }
}

/// One page of search results plus the outcome it belongs to.
#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub status: MatchStatus,
    pub origin: Point,

    /// The origin is a configured fallback, not the requested address
    pub approximate_origin: bool,

    /// The requested mode's provider gave up partway
    pub mode_unreliable: bool,

    pub radius_km: f64,
    pub funnel: Funnel,
    pub stats: RefineStats,
    pub sort: SortKey,

    /// Display position of the first result in this page
    pub start: usize,
    pub revealed: usize,
    pub total: usize,
    pub has_more: bool,

    pub results: Vec<FacilityResult>,
}

impl PageResponse {
    /// `routes` holds transit route details aligned with `page.items`.
    pub fn from_page(page: &Page, routes: &[Option<Arc<TransitRoute>>]) -> Self {
        let outcome = &page.outcome;
        Self {
            status: outcome.status,
            origin: Point {
                lat: outcome.origin.lat(),
                lng: outcome.origin.lng(),
            },
            approximate_origin: outcome.approximate_origin,
            mode_unreliable: outcome.mode_unreliable(),
            radius_km: outcome.radius_km,
            funnel: outcome.funnel,
            stats: outcome.stats.clone(),
            sort: page.sort,
            start: page.start,
            revealed: page.revealed,
            total: page.total,
            has_more: page.has_more(),
            results: page
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let route = routes.get(i).and_then(|r| r.as_deref()).cloned();
                    FacilityResult::from_result(item).with_route(route)
                })
                .collect(),
        }
    }
}

/// The specialty catalog.
#[derive(Debug, Serialize)]
pub struct SpecialtiesResponse {
    pub specialties: Vec<SpecialtyView>,
    pub common: Vec<SpecialtyView>,
}

impl SpecialtiesResponse {
    pub fn catalog() -> Self {
        let view = |code: &str, name: &str| SpecialtyView {
            code: code.to_string(),
            name: Some(name.to_string()),
        };

        Self {
            specialties: SPECIALTIES.iter().map(|(c, n)| view(c, n)).collect(),
            common: COMMON_SPECIALTIES
                .iter()
                .filter_map(|c| SPECIALTIES.iter().find(|(code, _)| code == c))
                .map(|(c, n)| view(c, n))
                .collect(),
        }
    }
}

/// Spatial index health and the load it was built from.
#[derive(Debug, Serialize)]
pub struct IndexStatsResponse {
    pub index: IndexStats,
    pub ingest: IngestReport,
    pub invalid_rows: usize,
    pub loaded_at: DateTime<Utc>,
    pub cached_searches: u64,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
