//! Reachability search pipeline.
//!
//! This module answers: "which facilities offering these specialties can I
//! reach from here within this many minutes?"
//!
//! Each search narrows the facility set in stages. A per-mode time budget
//! becomes a generous straight-line radius, the spatial index returns the
//! facilities inside it, the specialty filter narrows them, and the refiner
//! asks a travel-time provider for real durations of the nearest few
//! hundred. Results are cached per request signature and revealed a page at
//! a time.

mod config;
mod estimate;
mod filter;
mod rank;
mod refine;
mod result;
mod search;

#[cfg(test)]
mod refine_tests;

pub use config::SearchConfig;
pub use estimate::estimate_radius_km;
pub use filter::{AsFacility, filter_by_specialty, matches_specialties};
pub use rank::{Page, ResultView, SortKey, collation_key, sort_order};
pub use refine::{RefineStats, Refinement, Refiner, TravelTimeProvider};
pub use result::{ReachabilityResult, TravelEstimate};
pub use search::{
    Funnel, MAX_MINUTES, MatchStatus, SearchError, SearchKey, SearchOutcome, SearchRequest,
    SearchSession,
};
