//! Query and answer types shared by the routing client and the refiner.

use serde::Serialize;

use crate::domain::{LatLng, TransitOptions};

/// Upstream limit on destinations in one matrix call.
pub const MAX_DESTINATIONS_PER_CALL: usize = 25;

/// Mode-specific parameters of a single upstream call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryMode {
    Drive { avoid_highways: bool },
    Transit(TransitOptions),
    Walk,
    Bicycle,
}

impl QueryMode {
    /// Mode name as the upstream API spells it.
    pub fn api_name(&self) -> &'static str {
        match self {
            QueryMode::Drive { .. } => "driving",
            QueryMode::Transit(_) => "transit",
            QueryMode::Walk => "walking",
            QueryMode::Bicycle => "bicycling",
        }
    }
}

/// One origin, several destinations, one mode.
#[derive(Debug, Clone)]
pub struct MatrixQuery<'a> {
    pub origin: LatLng,
    pub destinations: &'a [LatLng],
    pub mode: QueryMode,
}

/// A routed duration and distance to one destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelLeg {
    pub duration_secs: u64,
    pub duration_text: String,
    pub distance_meters: u64,
    pub distance_text: String,
}

impl TravelLeg {
    pub fn within(&self, budget_secs: u64) -> bool {
        self.duration_secs <= budget_secs
    }
}

/// Per-destination answer from a matrix call.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementOutcome {
    Route(TravelLeg),
    /// The provider answered but has no usable route (e.g. `ZERO_RESULTS`).
    NoRoute { status: String },
}

impl ElementOutcome {
    pub fn leg(&self) -> Option<&TravelLeg> {
        match self {
            ElementOutcome::Route(leg) => Some(leg),
            ElementOutcome::NoRoute { .. } => None,
        }
    }

    pub fn into_leg(self) -> Option<TravelLeg> {
        match self {
            ElementOutcome::Route(leg) => Some(leg),
            ElementOutcome::NoRoute { .. } => None,
        }
    }
}
