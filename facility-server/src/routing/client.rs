//! Distance matrix HTTP client.
//!
//! Provides async travel-time queries against a distance-matrix API.
//! Handles authentication, concurrency limiting, and conversion to
//! per-destination outcomes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::domain::{Departure, LatLng, TransitOptions, TransitRoutePreference};
use crate::planner::TravelTimeProvider;

use super::convert::convert_matrix;
use super::directions::{DirectionsResponse, TransitRoute, convert_route};
use super::error::RoutingError;
use super::query::{ElementOutcome, MatrixQuery, QueryMode};
use super::types::DistanceMatrixResponse;

/// Default endpoint for the distance matrix API.
const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Default endpoint for the directions API.
const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Configuration for the routing client.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// API key passed as the `key` query parameter
    pub api_key: String,
    /// Endpoint URL (defaults to the production API)
    pub base_url: String,
    /// Directions endpoint, used for transit route details
    pub directions_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Language for duration/distance display text
    pub language: String,
}

impl RoutingConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            directions_url: DEFAULT_DIRECTIONS_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 15,
            language: "ja".to_string(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a custom directions URL (for testing).
    pub fn with_directions_url(mut self, url: impl Into<String>) -> Self {
        self.directions_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the display language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Distance matrix API client.
///
/// Uses a semaphore to limit concurrent requests and avoid rate limiting.
#[derive(Debug, Clone)]
pub struct RoutingClient {
    http: reqwest::Client,
    config: RoutingConfig,
    semaphore: Arc<Semaphore>,
}

impl RoutingClient {
    /// Create a new routing client with the given configuration.
    pub fn new(config: RoutingConfig) -> Result<Self, RoutingError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
        })
    }

    /// Query parameters for one matrix call.
    fn query_params(&self, query: &MatrixQuery<'_>) -> Vec<(&'static str, String)> {
        let destinations = query
            .destinations
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("|");

        let mut params = vec![
            ("origins", query.origin.to_string()),
            ("destinations", destinations),
            ("mode", query.mode.api_name().to_string()),
            ("units", "metric".to_string()),
            ("language", self.config.language.clone()),
            ("key", self.config.api_key.clone()),
        ];

        match query.mode {
            QueryMode::Drive {
                avoid_highways: true,
            } => params.push(("avoid", "highways".to_string())),
            QueryMode::Transit(options) => push_transit_params(&mut params, options),
            _ => {}
        }

        params
    }

    /// Run one matrix call.
    pub async fn get_matrix(
        &self,
        query: &MatrixQuery<'_>,
    ) -> Result<Vec<ElementOutcome>, RoutingError> {
        if query.destinations.is_empty() {
            return Ok(Vec::new());
        }

        let matrix: DistanceMatrixResponse = self
            .fetch(&self.config.base_url, &self.query_params(query))
            .await?;

        convert_matrix(matrix, query.destinations.len())
    }

    /// Fetch the transit route from `origin` to `destination`.
    ///
    /// `Ok(None)` when the provider has no transit route between them.
    pub async fn get_transit_route(
        &self,
        origin: LatLng,
        destination: LatLng,
        options: TransitOptions,
    ) -> Result<Option<TransitRoute>, RoutingError> {
        let mut params = vec![
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("mode", "transit".to_string()),
            ("units", "metric".to_string()),
            ("language", self.config.language.clone()),
            ("key", self.config.api_key.clone()),
        ];
        push_transit_params(&mut params, options);

        let response: DirectionsResponse =
            self.fetch(&self.config.directions_url, &params).await?;

        convert_route(response)
    }

    /// One rate-limited GET, decoded as JSON.
    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, RoutingError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RoutingError::Api {
                status: "CLIENT".to_string(),
                message: "Semaphore closed".to_string(),
            })?;

        let response = self.http.get(url).query(params).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RoutingError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RoutingError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingError::Api {
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| RoutingError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

fn push_transit_params(params: &mut Vec<(&'static str, String)>, options: TransitOptions) {
    let departure = match options.departure {
        Departure::Now => "now".to_string(),
        Departure::At(at) => at.timestamp().to_string(),
    };
    params.push(("departure_time", departure));

    if let Some(preference) = options.preference {
        let preference = match preference {
            TransitRoutePreference::LessWalking => "less_walking",
            TransitRoutePreference::FewerTransfers => "fewer_transfers",
        };
        params.push(("transit_routing_preference", preference.to_string()));
    }
}

impl TravelTimeProvider for RoutingClient {
    async fn travel_times(
        &self,
        query: &MatrixQuery<'_>,
    ) -> Result<Vec<ElementOutcome>, RoutingError> {
        self.get_matrix(query).await
    }

    async fn transit_route(
        &self,
        origin: LatLng,
        destination: LatLng,
        options: TransitOptions,
    ) -> Result<Option<TransitRoute>, RoutingError> {
        self.get_transit_route(origin, destination, options).await
    }
}
