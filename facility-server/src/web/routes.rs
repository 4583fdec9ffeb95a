//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::geocode::GeocodeError;
use crate::planner::{Page, SearchError, SearchRequest};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", post(search))
        .route("/api/search/more", post(more))
        .route("/api/search/sort", post(sort))
        .route("/api/specialties", get(specialties))
        .route("/api/index/stats", get(index_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Run a search and return its first page.
async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<PageResponse>, AppError> {
    let page = state.session.search(&req).await?;
    Ok(Json(page_response(&state, &page).await))
}

/// Reveal the next page of the current search.
async fn more(State(state): State<AppState>) -> Result<Json<PageResponse>, AppError> {
    let page = state.session.more().await?;
    Ok(Json(page_response(&state, &page).await))
}

/// Re-sort the current results and reveal from the start.
async fn sort(
    State(state): State<AppState>,
    Json(req): Json<SortRequest>,
) -> Result<Json<PageResponse>, AppError> {
    let page = state.session.resort(req.sort).await?;
    Ok(Json(page_response(&state, &page).await))
}

/// A page with transit route details for its items.
async fn page_response(state: &AppState, page: &Page) -> PageResponse {
    let routes = state.session.route_details(page).await;
    PageResponse::from_page(page, &routes)
}

async fn specialties() -> Json<SpecialtiesResponse> {
    Json(SpecialtiesResponse::catalog())
}

async fn index_stats(State(state): State<AppState>) -> Json<IndexStatsResponse> {
    let snapshot = state.session.catalog().snapshot().await;

    Json(IndexStatsResponse {
        index: snapshot.index.stats(),
        invalid_rows: snapshot.report.invalid(),
        ingest: snapshot.report.clone(),
        loaded_at: snapshot.loaded_at,
        cached_searches: state.session.cache().entry_count(),
    })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    Upstream { message: String },
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        let message = e.to_string();
        match e {
            SearchError::InvalidRequest(_) => AppError::BadRequest { message },
            SearchError::Geocode(GeocodeError::NotFound(_)) => AppError::NotFound { message },
            SearchError::Geocode(_) => AppError::Upstream { message },
            SearchError::NoActiveSearch => AppError::NotFound { message },
            SearchError::Superseded => AppError::Conflict { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::Upstream { message } => (StatusCode::BAD_GATEWAY, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
