//! Repository error types.

/// Errors that can occur while fetching or ingesting facility data.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed
    #[error("unauthorized: check SHEETS_API_KEY")]
    Unauthorized,

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Failed to read a local data file
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// The source returned no rows at all
    #[error("facility source returned no rows")]
    NoRows,

    /// Rows were returned but none of them validated.
    ///
    /// This almost always means the column layout no longer matches the
    /// source, not that the dataset is empty.
    #[error("none of {total} facility rows are valid; check the column layout")]
    NoValidRows { total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_invalid_are_distinct() {
        let empty = RepositoryError::NoRows;
        let invalid = RepositoryError::NoValidRows { total: 120 };

        assert_eq!(empty.to_string(), "facility source returned no rows");
        assert_eq!(
            invalid.to_string(),
            "none of 120 facility rows are valid; check the column layout"
        );
    }
}
