//! Geocoding error types.

/// Errors from resolving an address.
///
/// Cloneable so a failed search can be reported to every caller waiting on
/// the same request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeocodeError {
    /// The provider answered but found nothing for the address
    #[error("address not found: {0}")]
    NotFound(String),

    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: String, message: String },

    /// JSON deserialization failed
    #[error("JSON parse error: {0}")]
    Json(String),

    /// Invalid API key or request denied
    #[error("unauthorized (invalid API key or request denied)")]
    Unauthorized,

    /// Rate limited or over quota
    #[error("rate limited by geocoding API")]
    RateLimited,
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        GeocodeError::Http(e.to_string())
    }
}

impl GeocodeError {
    /// True when the provider itself failed, as opposed to answering
    /// "no such address".
    pub fn is_upstream_failure(&self) -> bool {
        !matches!(self, GeocodeError::NotFound(_))
    }
}
