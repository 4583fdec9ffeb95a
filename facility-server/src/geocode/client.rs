//! Geocoding HTTP client.

use serde::Deserialize;

use crate::domain::LatLng;

use super::Geocoder;
use super::error::GeocodeError;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Configuration for the geocoding client.
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    pub api_key: String,
    pub base_url: String,
    /// Region bias passed to the provider
    pub region: String,
    pub language: String,
    pub timeout_secs: u64,
}

impl GeocodeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            region: "jp".to_string(),
            language: "ja".to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Geocoding API client.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    http: reqwest::Client,
    config: GeocodeConfig,
}

impl GeocodingClient {
    pub fn new(config: GeocodeConfig) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    /// Resolve an address to its first candidate location.
    pub async fn lookup(&self, address: &str) -> Result<LatLng, GeocodeError> {
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[
                ("address", address),
                ("region", self.config.region.as_str()),
                ("language", self.config.language.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GeocodeError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        let body = response.text().await?;
        let parsed: GeocodeResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Json(e.to_string()))?;

        match parsed.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GeocodeError::NotFound(address.to_string())),
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(GeocodeError::RateLimited),
            "REQUEST_DENIED" => return Err(GeocodeError::Unauthorized),
            other => {
                return Err(GeocodeError::Api {
                    status: other.to_string(),
                    message: parsed.error_message.unwrap_or_default(),
                });
            }
        }

        let location = parsed
            .results
            .into_iter()
            .next()
            .map(|r| r.geometry.location)
            .ok_or_else(|| GeocodeError::NotFound(address.to_string()))?;

        LatLng::new(location.lat, location.lng).map_err(|e| GeocodeError::Api {
            status: "INVALID_LOCATION".to_string(),
            message: e.to_string(),
        })
    }
}

impl Geocoder for GeocodingClient {
    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError> {
        self.lookup(address).await
    }
}
