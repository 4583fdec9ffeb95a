//! Time budget to search radius.

use crate::domain::ModeKind;

/// Straight-line search radius for a time budget, in km.
///
/// Deliberately over-inclusive: average speed times minutes, inflated by the
/// mode's radius factor. False positives are removed by refinement; false
/// negatives would be lost for good.
pub fn estimate_radius_km(max_minutes: u32, mode: ModeKind) -> f64 {
    f64::from(max_minutes) / 60.0 * mode.average_speed_kmh() * mode.radius_factor()
}
