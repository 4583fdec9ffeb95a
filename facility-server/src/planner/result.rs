//! Per-facility reachability results.

use std::sync::Arc;

use crate::domain::Facility;
use crate::routing::TravelLeg;

/// How a facility's travel time was established.
#[derive(Debug, Clone, PartialEq)]
pub enum TravelEstimate {
    /// DRIVE mode: one leg per highway variant that answered.
    Drive {
        with_highways: Option<TravelLeg>,
        without_highways: Option<TravelLeg>,
    },
    /// A route in the requested mode.
    Direct { leg: TravelLeg },
    /// No transit route; a walking route stands in.
    WalkingFallback { leg: TravelLeg },
}

impl TravelEstimate {
    /// Primary duration in seconds, `+inf` when unknown.
    ///
    /// DRIVE ranks by the with-highways variant even when only the
    /// without-highways variant qualified the facility.
    pub fn sort_key(&self) -> f64 {
        let leg = match self {
            TravelEstimate::Drive { with_highways, .. } => with_highways.as_ref(),
            TravelEstimate::Direct { leg } | TravelEstimate::WalkingFallback { leg } => Some(leg),
        };
        leg.map_or(f64::INFINITY, |l| l.duration_secs as f64)
    }

    /// The leg shown to users: with-highways first for DRIVE.
    pub fn display_leg(&self) -> Option<&TravelLeg> {
        match self {
            TravelEstimate::Drive {
                with_highways,
                without_highways,
            } => with_highways.as_ref().or(without_highways.as_ref()),
            TravelEstimate::Direct { leg } | TravelEstimate::WalkingFallback { leg } => Some(leg),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TravelEstimate::WalkingFallback { .. })
    }
}

/// A facility that passed refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachabilityResult {
    pub facility: Arc<Facility>,
    /// Haversine distance from the origin.
    pub straight_line_km: f64,
    pub estimate: TravelEstimate,
}

impl ReachabilityResult {
    pub fn sort_key(&self) -> f64 {
        self.estimate.sort_key()
    }

    pub fn is_fallback(&self) -> bool {
        self.estimate.is_fallback()
    }

    pub fn distance_text(&self) -> Option<&str> {
        self.estimate
            .display_leg()
            .map(|leg| leg.distance_text.as_str())
    }

    /// Route distance in metres, or the straight-line distance when no
    /// route distance is known.
    pub fn route_distance_meters(&self) -> f64 {
        self.estimate
            .display_leg()
            .map_or(self.straight_line_km * 1000.0, |leg| {
                leg.distance_meters as f64
            })
    }
}
