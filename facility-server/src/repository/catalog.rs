//! The loaded facility set and its spatial index.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::Facility;
use crate::spatial::SpatialIndex;

use super::client::FacilitySource;
use super::error::RepositoryError;
use super::ingest::{IngestConfig, IngestReport, ingest_rows};

/// One immutable load of the facility data.
#[derive(Debug)]
pub struct CatalogSnapshot {
    /// Increases by one with every successful load.
    pub generation: u64,
    pub facilities: Vec<Arc<Facility>>,
    pub index: SpatialIndex,
    pub report: IngestReport,
    pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Build a snapshot from already-validated facilities.
    pub fn from_facilities(
        facilities: Vec<Arc<Facility>>,
        report: IngestReport,
        cell_size_deg: f64,
    ) -> Self {
        let index = SpatialIndex::build(&facilities, cell_size_deg);
        let stats = index.stats();
        info!(
            cells = stats.cell_count,
            facilities = stats.facility_count,
            max_bucket = stats.max_bucket,
            mean_bucket = stats.mean_bucket,
            "Spatial index built"
        );

        Self {
            generation: 0,
            facilities,
            index,
            report,
            loaded_at: Utc::now(),
        }
    }
}

/// Thread-safe facility catalog with support for background refresh.
///
/// Readers take an `Arc` to the current snapshot, so a refresh never
/// disturbs a search already running against the previous one.
#[derive(Clone)]
pub struct FacilityCatalog {
    inner: Arc<RwLock<Arc<CatalogSnapshot>>>,
    source: Arc<FacilitySource>,
    ingest: IngestConfig,
    cell_size_deg: f64,
}

impl FacilityCatalog {
    /// Load the catalog from its source.
    ///
    /// Fails if the source is unreachable, empty, or yields no valid rows.
    pub async fn load(
        source: FacilitySource,
        ingest: IngestConfig,
        cell_size_deg: f64,
    ) -> Result<Self, RepositoryError> {
        let snapshot = Self::fetch_snapshot(&source, &ingest, cell_size_deg).await?;

        Ok(Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
            source: Arc::new(source),
            ingest,
            cell_size_deg,
        })
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.inner.read().await.clone()
    }

    /// Reload from the source and rebuild the index.
    ///
    /// On success, replaces the current snapshot. On failure, the existing
    /// snapshot is preserved and the error is returned.
    pub async fn refresh(&self) -> Result<IngestReport, RepositoryError> {
        let mut snapshot =
            Self::fetch_snapshot(&self.source, &self.ingest, self.cell_size_deg).await?;
        let report = snapshot.report.clone();

        let mut guard = self.inner.write().await;
        snapshot.generation = guard.generation + 1;
        *guard = Arc::new(snapshot);

        Ok(report)
    }

    async fn fetch_snapshot(
        source: &FacilitySource,
        ingest: &IngestConfig,
        cell_size_deg: f64,
    ) -> Result<CatalogSnapshot, RepositoryError> {
        info!(source = %source.describe(), "Loading facilities");
        let rows = source.fetch_rows().await?;
        let (facilities, report) = ingest_rows(rows, ingest).await?;
        Ok(CatalogSnapshot::from_facilities(
            facilities,
            report,
            cell_size_deg,
        ))
    }
}
