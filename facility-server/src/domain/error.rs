//! Domain error types.
//!
//! These errors represent validation failures of individual values. They are
//! distinct from API/IO errors, which live next to their clients.

/// Domain-level errors for value validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Coordinate is not finite or outside the valid lat/lng range
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(&'static str),

    /// Specialty token is empty or contains separators
    #[error("invalid specialty code: {0:?}")]
    InvalidSpecialtyCode(String),

    /// Travel mode name not recognised
    #[error("unknown travel mode: {0}")]
    UnknownTravelMode(String),

    /// Specialty filter mode name not recognised
    #[error("unknown specialty filter mode: {0}")]
    UnknownFilterMode(String),

    /// Drive options disable both highway variants
    #[error("drive options must enable at least one highway variant")]
    NoDriveVariant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidCoordinate("latitude out of range");
        assert_eq!(err.to_string(), "invalid coordinate: latitude out of range");

        let err = DomainError::InvalidSpecialtyCode("a,b".into());
        assert_eq!(err.to_string(), "invalid specialty code: \"a,b\"");

        let err = DomainError::UnknownTravelMode("FLYING".into());
        assert_eq!(err.to_string(), "unknown travel mode: FLYING");

        let err = DomainError::NoDriveVariant;
        assert_eq!(
            err.to_string(),
            "drive options must enable at least one highway variant"
        );
    }
}
