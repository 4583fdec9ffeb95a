//! Specialty filter.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::{Facility, SpecialtyCode, SpecialtyFilterMode};
use crate::spatial::Nearby;

/// Anything that carries a facility.
pub trait AsFacility {
    fn facility(&self) -> &Facility;
}

impl AsFacility for Facility {
    fn facility(&self) -> &Facility {
        self
    }
}

impl AsFacility for Arc<Facility> {
    fn facility(&self) -> &Facility {
        self
    }
}

impl AsFacility for Nearby {
    fn facility(&self) -> &Facility {
        &self.facility
    }
}

/// Whether a facility satisfies the selection.
pub fn matches_specialties(
    facility: &Facility,
    selected: &BTreeSet<SpecialtyCode>,
    mode: SpecialtyFilterMode,
) -> bool {
    if selected.is_empty() {
        return true;
    }

    match mode {
        SpecialtyFilterMode::All => selected.iter().all(|code| facility.has_specialty(code)),
        SpecialtyFilterMode::Any => selected.iter().any(|code| facility.has_specialty(code)),
    }
}

/// Keep the items whose facility satisfies the selection, in order.
///
/// An empty selection returns the input unchanged.
pub fn filter_by_specialty<T: AsFacility>(
    items: Vec<T>,
    selected: &BTreeSet<SpecialtyCode>,
    mode: SpecialtyFilterMode,
) -> Vec<T> {
    if selected.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| matches_specialties(item.facility(), selected, mode))
        .collect()
}
