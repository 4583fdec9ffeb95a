use std::process::ExitCode;

use facility_server::config::{AppConfig, SourceConfig};
use facility_server::geocode::GeocodingClient;
use facility_server::planner::{SearchConfig, SearchSession};
use facility_server::repository::{
    FacilityCatalog, FacilitySource, IngestConfig, SheetsClient, SheetsConfig,
};
use facility_server::routing::RoutingClient;
use facility_server::web::{AppState, create_router};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let source = match &config.source {
        SourceConfig::File(path) => FacilitySource::File(path.clone()),
        SourceConfig::Sheet {
            api_key,
            spreadsheet_id,
            range,
        } => FacilitySource::Sheets(SheetsClient::new(SheetsConfig::new(
            api_key,
            spreadsheet_id,
            range,
        ))?),
    };

    let search_config = SearchConfig::default().with_fallback_origin(config.fallback_origin);
    let ingest = IngestConfig::default().with_layout(config.columns);

    // Fail fast: there is nothing to search without facilities
    let catalog = FacilityCatalog::load(source, ingest, search_config.cell_size_deg).await?;

    let routing = RoutingClient::new(config.routing.clone())?;
    let geocoder = GeocodingClient::new(config.geocode.clone())?;

    let state = AppState::new(SearchSession::new(
        routing,
        geocoder,
        catalog,
        &config.cache,
        search_config,
    ));

    let session = state.session.clone();
    let refresh_interval = config.refresh_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_interval);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            if let Err(e) = session.reload_facilities().await {
                warn!(error = %e, "Facility refresh failed, keeping previous set");
            }
        }
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Facility search listening");
    info!("  GET  /health            - Health check");
    info!("  POST /api/search        - Run a search");
    info!("  POST /api/search/more   - Reveal more results");
    info!("  POST /api/search/sort   - Re-sort current results");
    info!("  GET  /api/specialties   - Specialty catalog");
    info!("  GET  /api/index/stats   - Index statistics");

    axum::serve(listener, app).await?;
    Ok(())
}
