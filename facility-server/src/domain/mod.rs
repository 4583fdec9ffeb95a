//! Core domain types for the facility search.
//!
//! These types are independent of any upstream API. Values that reach the
//! search pipeline have already been validated: a `LatLng` is always a
//! finite, in-range coordinate and a `SpecialtyCode` is always a clean token.

mod coord;
mod error;
mod facility;
mod mode;
mod specialty;

pub use coord::{BoundingBox, EARTH_RADIUS_KM, LatLng, haversine_km};
pub use error::DomainError;
pub use facility::Facility;
pub use mode::{
    Departure, DriveOptions, ModeKind, TransitOptions, TransitRoutePreference, TravelMode,
};
pub use specialty::{
    COMMON_SPECIALTIES, SPECIALTIES, SpecialtyCode, SpecialtyFilterMode, specialty_name,
};
