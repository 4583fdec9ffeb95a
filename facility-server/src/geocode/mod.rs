//! Address geocoding.
//!
//! Resolves a free-text origin address to a coordinate. The search pipeline
//! depends only on the [`Geocoder`] trait so tests can supply fixed points.

mod client;
mod error;

use std::future::Future;

use crate::domain::LatLng;

pub use client::{GeocodeConfig, GeocodingClient};
pub use error::GeocodeError;

/// Something that can turn an address into a coordinate.
pub trait Geocoder {
    fn geocode(&self, address: &str) -> impl Future<Output = Result<LatLng, GeocodeError>> + Send;
}
