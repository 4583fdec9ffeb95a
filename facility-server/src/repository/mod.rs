//! Facility data source, ingestion and the loaded catalog.
//!
//! Raw rows come from a spreadsheet (or a local JSON export of one) and are
//! validated into `Facility` records. The loaded facility set and its spatial
//! index are held together in a `FacilityCatalog` snapshot that can be
//! refreshed wholesale.

mod catalog;
mod client;
mod error;
mod ingest;

pub use catalog::{CatalogSnapshot, FacilityCatalog};
pub use client::{FacilitySource, SheetsClient, SheetsConfig};
pub use error::RepositoryError;
pub use ingest::{
    ColumnLayout, IngestConfig, IngestReport, RowRejection, ingest_rows, parse_decimal, parse_row,
};
