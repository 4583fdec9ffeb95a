//! Facility records.

use std::collections::BTreeSet;

use serde::Serialize;

use super::coord::LatLng;
use super::specialty::SpecialtyCode;

/// A searchable healthcare facility.
///
/// Facilities are immutable once loaded and are shared between the catalog,
/// the spatial index and search results via `Arc<Facility>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub name: String,
    pub address: String,
    pub specialties: BTreeSet<SpecialtyCode>,
    pub location: LatLng,
}

impl Facility {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        specialties: BTreeSet<SpecialtyCode>,
        location: LatLng,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            specialties,
            location,
        }
    }

    pub fn has_specialty(&self, code: &SpecialtyCode) -> bool {
        self.specialties.contains(code)
    }
}
