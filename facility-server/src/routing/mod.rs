//! Travel-time provider client.
//!
//! This module provides an HTTP client for a distance-matrix style routing
//! API: one origin, up to 25 destinations per call, and a per-destination
//! duration/distance or failure status in the response.
//!
//! Key characteristics of the provider:
//! - A whole call can fail (quota, auth, transport) independently of the
//!   per-destination element statuses
//! - An element with status other than `OK` means "no usable route", which
//!   is an answer, not an error
//! - Transit queries need a departure time; "now" is resolved per call

mod client;
mod convert;
mod directions;
mod error;
mod query;
mod types;

pub use client::{RoutingClient, RoutingConfig};
pub use convert::convert_matrix;
pub use directions::{
    DirectionsResponse, RouteStep, TransitRoute, TransitStep, convert_route,
};
pub use error::RoutingError;
pub use query::{ElementOutcome, MAX_DESTINATIONS_PER_CALL, MatrixQuery, QueryMode, TravelLeg};
pub use types::{DistanceMatrixResponse, MatrixElement, MatrixRow, TextValue};
