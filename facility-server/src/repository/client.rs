//! Facility data sources: spreadsheet values API or a local export.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::RepositoryError;

/// Default base URL for the spreadsheet values API.
const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Response from the values endpoint. `values` is omitted for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// A local export: either the raw values response or a bare row array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileRows {
    Wrapped(ValueRange),
    Bare(Vec<Vec<String>>),
}

/// Configuration for the spreadsheet client.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// API key passed as the `key` query parameter
    pub api_key: String,
    /// Spreadsheet identifier
    pub spreadsheet_id: String,
    /// A1-notation range, including the sheet name
    pub range: String,
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl SheetsConfig {
    pub fn new(
        api_key: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Client for the spreadsheet values API.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    config: SheetsConfig,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Result<Self, RepositoryError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    /// Fetch every row in the configured range.
    pub async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, RepositoryError> {
        let url = format!(
            "{}/{}/values/{}",
            self.config.base_url, self.config.spreadsheet_id, self.config.range
        );

        let response = self
            .http
            .get(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RepositoryError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let range: ValueRange =
            serde_json::from_str(&body).map_err(|e| RepositoryError::Json {
                message: e.to_string(),
            })?;

        Ok(range.values)
    }
}

/// Where facility rows come from.
#[derive(Debug, Clone)]
pub enum FacilitySource {
    /// Live spreadsheet.
    Sheets(SheetsClient),
    /// JSON export on disk, in values-response or bare-array form.
    File(PathBuf),
    /// Rows supplied in memory.
    Rows(Vec<Vec<String>>),
}

impl FacilitySource {
    pub async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, RepositoryError> {
        match self {
            FacilitySource::Sheets(client) => client.fetch_rows().await,
            FacilitySource::File(path) => read_rows_file(path).await,
            FacilitySource::Rows(rows) => Ok(rows.clone()),
        }
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            FacilitySource::Sheets(client) => format!("sheet {}", client.config.spreadsheet_id),
            FacilitySource::File(path) => format!("file {}", path.display()),
            FacilitySource::Rows(rows) => format!("{} in-memory rows", rows.len()),
        }
    }
}

async fn read_rows_file(path: &Path) -> Result<Vec<Vec<String>>, RepositoryError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| RepositoryError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let rows: FileRows = serde_json::from_str(&contents).map_err(|e| RepositoryError::Json {
        message: format!("{}: {e}", path.display()),
    })?;

    Ok(match rows {
        FileRows::Wrapped(range) => range.values,
        FileRows::Bare(rows) => rows,
    })
}
