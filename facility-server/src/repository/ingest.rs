//! Row validation and chunked ingestion.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{BoundingBox, Facility, LatLng, SpecialtyCode};

use super::error::RepositoryError;

/// Default number of rows validated between yields.
const DEFAULT_CHUNK_SIZE: usize = 500;

/// Column positions of each field within a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: usize,
    pub specialties: usize,
    pub address: usize,
    pub lat: usize,
    pub lng: usize,
}

impl ColumnLayout {
    /// Minimum row length needed to read every required column.
    ///
    /// The specialty column is optional: sheet exports drop trailing empty
    /// cells, and a facility without tags is still searchable.
    fn required_len(&self) -> usize {
        [self.name, self.address, self.lat, self.lng]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            name: 0,
            specialties: 1,
            address: 2,
            lat: 3,
            lng: 4,
        }
    }
}

impl FromStr for ColumnLayout {
    type Err = String;

    /// Parse five comma-separated indices: name, specialties, address, lat, lng.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let indices = s
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid column index: {e}"))?;

        match indices.as_slice() {
            [name, specialties, address, lat, lng] => Ok(Self {
                name: *name,
                specialties: *specialties,
                address: *address,
                lat: *lat,
                lng: *lng,
            }),
            _ => Err(format!("expected 5 column indices, got {}", indices.len())),
        }
    }
}

/// Configuration for row ingestion.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub layout: ColumnLayout,

    /// Coordinates outside this box are rejected.
    pub bounds: BoundingBox,

    /// Rows validated between cooperative yields.
    pub chunk_size: usize,
}

impl IngestConfig {
    pub fn with_layout(mut self, layout: ColumnLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            layout: ColumnLayout::default(),
            bounds: BoundingBox::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Why a row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRejection {
    TooFewColumns,
    MissingName,
    MissingAddress,
    BadLatitude,
    BadLongitude,
    OutOfBounds,
}

/// Validity counts for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub total_rows: usize,
    pub valid: usize,
    pub rejected: BTreeMap<RowRejection, usize>,
}

impl IngestReport {
    pub fn invalid(&self) -> usize {
        self.total_rows - self.valid
    }

    fn record(&mut self, outcome: &Result<Facility, RowRejection>) {
        self.total_rows += 1;
        match outcome {
            Ok(_) => self.valid += 1,
            Err(reason) => *self.rejected.entry(*reason).or_default() += 1,
        }
    }
}

/// Parse a decimal that may use a comma as the decimal separator.
///
/// ```
/// use facility_server::repository::parse_decimal;
///
/// assert_eq!(parse_decimal("35.68"), Some(35.68));
/// assert_eq!(parse_decimal(" 35,68 "), Some(35.68));
/// assert_eq!(parse_decimal("north"), None);
/// ```
pub fn parse_decimal(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    let value = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replacen(',', ".", 1).parse::<f64>().ok()?
    } else {
        trimmed.parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}

/// Validate a single raw row into a facility.
pub fn parse_row(row: &[String], config: &IngestConfig) -> Result<Facility, RowRejection> {
    let layout = &config.layout;
    if row.len() < layout.required_len() {
        return Err(RowRejection::TooFewColumns);
    }

    let name = row[layout.name].trim();
    if name.is_empty() {
        return Err(RowRejection::MissingName);
    }

    let address = row[layout.address].trim();
    if address.is_empty() {
        return Err(RowRejection::MissingAddress);
    }

    let lat = parse_decimal(&row[layout.lat]).ok_or(RowRejection::BadLatitude)?;
    let lng = parse_decimal(&row[layout.lng]).ok_or(RowRejection::BadLongitude)?;

    let location = LatLng::new(lat, lng).map_err(|_| {
        if (-90.0..=90.0).contains(&lat) {
            RowRejection::BadLongitude
        } else {
            RowRejection::BadLatitude
        }
    })?;

    if !config.bounds.contains(&location) {
        return Err(RowRejection::OutOfBounds);
    }

    let specialties = row
        .get(layout.specialties)
        .map(|cell| SpecialtyCode::parse_list(cell))
        .unwrap_or_default();

    Ok(Facility::new(name, address, specialties, location))
}

/// Validate all rows, yielding to the runtime between chunks.
///
/// Rejected rows are counted, not fatal. Returns `NoRows` when the source
/// was empty and `NoValidRows` when nothing survived validation, so a
/// column-layout regression is never mistaken for an empty dataset.
pub async fn ingest_rows(
    rows: Vec<Vec<String>>,
    config: &IngestConfig,
) -> Result<(Vec<Arc<Facility>>, IngestReport), RepositoryError> {
    if rows.is_empty() {
        return Err(RepositoryError::NoRows);
    }

    let mut facilities = Vec::with_capacity(rows.len());
    let mut report = IngestReport::default();

    for chunk in rows.chunks(config.chunk_size.max(1)) {
        for row in chunk {
            let outcome = parse_row(row, config);
            report.record(&outcome);
            if let Ok(facility) = outcome {
                facilities.push(Arc::new(facility));
            }
        }

        debug!(
            processed = report.total_rows,
            total = rows.len(),
            valid = report.valid,
            "Ingestion progress"
        );
        tokio::task::yield_now().await;
    }

    info!(
        valid = report.valid,
        invalid = report.invalid(),
        rejected = ?report.rejected,
        "Facility rows ingested"
    );

    if report.valid == 0 {
        return Err(RepositoryError::NoValidRows {
            total: report.total_rows,
        });
    }

    Ok((facilities, report))
}
