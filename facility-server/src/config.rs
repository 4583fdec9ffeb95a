//! Server configuration from environment variables.

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::domain::LatLng;
use crate::geocode::GeocodeConfig;
use crate::repository::ColumnLayout;
use crate::routing::RoutingConfig;

/// Range read from the sheet when `FACILITY_SHEET_RANGE` is unset.
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A2:E";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_REFRESH_SECS: u64 = 24 * 60 * 60;

/// Error reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// Where facility rows are loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Sheet {
        api_key: String,
        spreadsheet_id: String,
        range: String,
    },
    File(PathBuf),
}

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub columns: ColumnLayout,
    pub bind_addr: SocketAddr,
    pub fallback_origin: Option<LatLng>,
    pub refresh_interval: Duration,
    pub cache: CacheConfig,
    pub routing: RoutingConfig,
    pub geocode: GeocodeConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let maps_api_key = get("MAPS_API_KEY").ok_or(ConfigError::Missing("MAPS_API_KEY"))?;

        let source = match get("FACILITY_FILE") {
            Some(path) => SourceConfig::File(PathBuf::from(path)),
            None => SourceConfig::Sheet {
                api_key: get("SHEETS_API_KEY").unwrap_or_else(|| maps_api_key.clone()),
                spreadsheet_id: get("FACILITY_SHEET_ID")
                    .ok_or(ConfigError::Missing("FACILITY_SHEET_ID"))?,
                range: get("FACILITY_SHEET_RANGE")
                    .unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            },
        };

        let columns = match get("FACILITY_COLUMNS") {
            Some(value) => value
                .parse()
                .map_err(|message| invalid("FACILITY_COLUMNS", &value, message))?,
            None => ColumnLayout::default(),
        };

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e: AddrParseError| invalid("BIND_ADDR", &bind_addr, e.to_string()))?;

        let fallback_origin = match get("FALLBACK_ORIGIN") {
            Some(value) => Some(
                parse_lat_lng(&value)
                    .map_err(|message| invalid("FALLBACK_ORIGIN", &value, message))?,
            ),
            None => None,
        };

        let positive = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            let Some(value) = get(key) else {
                return Ok(None);
            };
            match value.trim().parse::<u64>() {
                Ok(0) => Err(invalid(key, &value, "must be positive".to_string())),
                Ok(n) => Ok(Some(n)),
                Err(e) => Err(invalid(key, &value, e.to_string())),
            }
        };

        let refresh_secs = positive("FACILITY_REFRESH_SECS")?.unwrap_or(DEFAULT_REFRESH_SECS);

        let mut cache =
            CacheConfig::default().with_ttl(positive("CACHE_TTL_SECS")?.map(Duration::from_secs));
        if let Some(entries) = positive("CACHE_MAX_ENTRIES")? {
            cache = cache.with_max_capacity(entries);
        }

        let mut routing = RoutingConfig::new(&maps_api_key);
        let mut geocode = GeocodeConfig::new(&maps_api_key);
        if let Some(language) = get("MAPS_LANGUAGE") {
            routing = routing.with_language(&language);
            geocode = geocode.with_language(language);
        }
        if let Some(region) = get("MAPS_REGION") {
            geocode = geocode.with_region(region);
        }
        if let Some(n) = positive("ROUTING_MAX_CONCURRENT")? {
            routing = routing.with_max_concurrent(n as usize);
        }
        if let Some(secs) = positive("ROUTING_TIMEOUT_SECS")? {
            routing = routing.with_timeout(secs);
        }

        Ok(Self {
            source,
            columns,
            bind_addr,
            fallback_origin,
            refresh_interval: Duration::from_secs(refresh_secs),
            cache,
            routing,
            geocode,
        })
    }
}

fn invalid(key: &'static str, value: &str, message: String) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        message,
    }
}

/// Parse `"lat,lng"`.
fn parse_lat_lng(value: &str) -> Result<LatLng, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| "expected \"lat,lng\"".to_string())?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lng = lng.trim().parse::<f64>().map_err(|e| e.to_string())?;
    LatLng::new(lat, lng).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn sheet_source_with_defaults() {
        let config = config(&[("MAPS_API_KEY", "maps"), ("FACILITY_SHEET_ID", "sheet")]).unwrap();

        assert_eq!(
            config.source,
            SourceConfig::Sheet {
                api_key: "maps".to_string(),
                spreadsheet_id: "sheet".to_string(),
                range: DEFAULT_SHEET_RANGE.to_string(),
            }
        );
        assert_eq!(config.columns, ColumnLayout::default());
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.fallback_origin, None);
        assert_eq!(config.refresh_interval, Duration::from_secs(86_400));
        assert_eq!(config.cache.ttl, None);
        assert_eq!(config.cache.max_capacity, CacheConfig::default().max_capacity);
        assert_eq!(config.routing.api_key, "maps");
        assert_eq!(config.routing.language, "ja");
        assert_eq!(config.geocode.region, "jp");
    }

    #[test]
    fn file_overrides_sheet() {
        let config = config(&[
            ("MAPS_API_KEY", "maps"),
            ("FACILITY_SHEET_ID", "sheet"),
            ("FACILITY_FILE", "/data/facilities.json"),
        ])
        .unwrap();

        assert_eq!(
            config.source,
            SourceConfig::File(PathBuf::from("/data/facilities.json"))
        );
    }

    #[test]
    fn explicit_values() {
        let config = config(&[
            ("MAPS_API_KEY", "maps"),
            ("SHEETS_API_KEY", "sheets"),
            ("FACILITY_SHEET_ID", "sheet"),
            ("FACILITY_SHEET_RANGE", "List!B2:F"),
            ("FACILITY_COLUMNS", "0,1,2,4,3"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("FALLBACK_ORIGIN", "35.6812, 139.7671"),
            ("FACILITY_REFRESH_SECS", "600"),
        ])
        .unwrap();

        let SourceConfig::Sheet { api_key, range, .. } = &config.source else {
            panic!("expected sheet source");
        };
        assert_eq!(api_key, "sheets");
        assert_eq!(range, "List!B2:F");
        assert_eq!(config.columns.lat, 4);
        assert_eq!(config.columns.lng, 3);
        assert_eq!(config.bind_addr.port(), 8080);
        assert!((config.fallback_origin.unwrap().lat() - 35.6812).abs() < 1e-9);
        assert_eq!(config.refresh_interval, Duration::from_secs(600));
    }

    #[test]
    fn upstream_and_cache_tuning() {
        let config = config(&[
            ("MAPS_API_KEY", "maps"),
            ("FACILITY_FILE", "f.json"),
            ("CACHE_TTL_SECS", "3600"),
            ("CACHE_MAX_ENTRIES", "50"),
            ("MAPS_LANGUAGE", "en"),
            ("MAPS_REGION", "us"),
            ("ROUTING_MAX_CONCURRENT", "2"),
            ("ROUTING_TIMEOUT_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(config.cache.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.cache.max_capacity, 50);
        assert_eq!(config.routing.language, "en");
        assert_eq!(config.routing.max_concurrent, 2);
        assert_eq!(config.routing.timeout_secs, 30);
        assert_eq!(config.geocode.language, "en");
        assert_eq!(config.geocode.region, "us");
    }

    #[test]
    fn missing_required() {
        assert!(matches!(
            config(&[("FACILITY_SHEET_ID", "sheet")]),
            Err(ConfigError::Missing("MAPS_API_KEY"))
        ));
        assert!(matches!(
            config(&[("MAPS_API_KEY", "maps"), ("FACILITY_SHEET_ID", "  ")]),
            Err(ConfigError::Missing("FACILITY_SHEET_ID"))
        ));
    }

    #[test]
    fn invalid_values() {
        let base = [("MAPS_API_KEY", "maps"), ("FACILITY_FILE", "f.json")];
        let with = |key, value| {
            let mut vars = base.to_vec();
            vars.push((key, value));
            config(&vars)
        };

        for (key, value) in [
            ("FACILITY_COLUMNS", "0,1,2"),
            ("BIND_ADDR", "localhost"),
            ("FALLBACK_ORIGIN", "35.6"),
            ("FALLBACK_ORIGIN", "95.0,139.0"),
            ("FACILITY_REFRESH_SECS", "0"),
            ("FACILITY_REFRESH_SECS", "daily"),
            ("CACHE_TTL_SECS", "0"),
            ("CACHE_MAX_ENTRIES", "-1"),
            ("ROUTING_MAX_CONCURRENT", "0"),
            ("ROUTING_TIMEOUT_SECS", "soon"),
        ] {
            match with(key, value) {
                Err(ConfigError::Invalid { key: k, .. }) => assert_eq!(k, key),
                other => panic!("{key}={value}: expected invalid, got {other:?}"),
            }
        }
    }
}
