//! Distance matrix API response DTOs.
//!
//! These types map directly to the JSON response. Duration and distance are
//! omitted for elements that have no route, so they are optional here.

use serde::Deserialize;

/// Top-level distance matrix response.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixResponse {
    /// `OK` or a request-level failure such as `OVER_QUERY_LIMIT`.
    pub status: String,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub origin_addresses: Vec<String>,

    #[serde(default)]
    pub destination_addresses: Vec<String>,

    /// One row per origin.
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

/// Elements for one origin, one per destination, in request order.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixRow {
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// Result for one origin/destination pair.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixElement {
    /// `OK`, `NOT_FOUND` or `ZERO_RESULTS`.
    pub status: String,

    pub duration: Option<TextValue>,

    pub distance: Option<TextValue>,
}

/// A value with its localized display text.
#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: u64,
}
