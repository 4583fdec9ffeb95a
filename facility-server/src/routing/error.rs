//! Routing client error types.

/// Errors from a travel-time query as a whole.
///
/// Per-destination "no route" answers are not errors; they are reported as
/// `ElementOutcome::NoRoute`.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code or a non-OK top-level status
    #[error("API error {status}: {message}")]
    Api { status: String, message: String },

    /// Rate limited or over quota
    #[error("rate limited by routing API")]
    RateLimited,

    /// Invalid API key or request denied
    #[error("unauthorized (invalid API key or request denied)")]
    Unauthorized,

    /// No answer within the configured wait
    #[error("routing call timed out")]
    Timeout,

    /// Response shape does not match the query
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RoutingError::Api {
            status: "INVALID_REQUEST".into(),
            message: "bad origin".into(),
        };
        assert_eq!(err.to_string(), "API error INVALID_REQUEST: bad origin");

        assert_eq!(RoutingError::Timeout.to_string(), "routing call timed out");
        assert_eq!(
            RoutingError::MalformedResponse("expected 3 elements, got 2".into()).to_string(),
            "malformed response: expected 3 elements, got 2"
        );
    }
}
