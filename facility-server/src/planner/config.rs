//! Search configuration for the reachability pipeline.

use std::time::Duration;

use crate::domain::{LatLng, ModeKind};
use crate::routing::MAX_DESTINATIONS_PER_CALL;

/// Configuration parameters for facility search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Grid cell size of the spatial index, in degrees.
    pub cell_size_deg: f64,

    /// Maximum candidates sent to the travel-time provider.
    pub max_candidates: usize,

    /// Maximum candidates in TRANSIT mode, where calls cost more.
    pub max_transit_candidates: usize,

    /// Destinations per upstream call.
    /// Clamped to the provider's per-call limit.
    pub batch_size: usize,

    /// Bounded wait for each upstream call.
    pub call_timeout: Duration,

    /// Delay between successive calls in DRIVE, WALK and BICYCLE modes.
    pub pacing: Duration,

    /// Delay between successive calls in TRANSIT mode.
    pub transit_pacing: Duration,

    /// Consecutive transit failures before transit refinement is
    /// abandoned. An unrouted destination counts once, and so does a
    /// failed call.
    pub transit_failure_threshold: usize,

    /// Results revealed per page.
    pub page_size: usize,

    /// Origin used when geocoding fails upstream. `None` disables it.
    pub fallback_origin: Option<LatLng>,
}

impl SearchConfig {
    /// Candidate cap for the given mode.
    pub fn candidate_cap(&self, mode: ModeKind) -> usize {
        match mode {
            ModeKind::Transit => self.max_transit_candidates,
            _ => self.max_candidates,
        }
    }

    /// Delay between successive calls for the given mode.
    pub fn pacing_for(&self, mode: ModeKind) -> Duration {
        match mode {
            ModeKind::Transit => self.transit_pacing,
            _ => self.pacing,
        }
    }

    /// Batch size actually used, never above the provider limit.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_DESTINATIONS_PER_CALL)
    }

    pub fn with_candidate_caps(mut self, max: usize, max_transit: usize) -> Self {
        self.max_candidates = max;
        self.max_transit_candidates = max_transit;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set both pacing delays.
    pub fn with_pacing(mut self, pacing: Duration, transit_pacing: Duration) -> Self {
        self.pacing = pacing;
        self.transit_pacing = transit_pacing;
        self
    }

    pub fn with_transit_failure_threshold(mut self, threshold: usize) -> Self {
        self.transit_failure_threshold = threshold;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_fallback_origin(mut self, origin: Option<LatLng>) -> Self {
        self.fallback_origin = origin;
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cell_size_deg: 0.05,
            max_candidates: 200,
            max_transit_candidates: 100,
            batch_size: MAX_DESTINATIONS_PER_CALL,
            call_timeout: Duration::from_secs(10),
            pacing: Duration::from_millis(100),
            transit_pacing: Duration::from_millis(300),
            transit_failure_threshold: 5,
            page_size: 20,
            fallback_origin: None,
        }
    }
}
