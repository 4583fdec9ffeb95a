//! Application state for the web layer.

use std::sync::Arc;

use crate::geocode::GeocodingClient;
use crate::planner::SearchSession;
use crate::routing::RoutingClient;

/// The search session served over HTTP.
pub type Session = SearchSession<RoutingClient, GeocodingClient>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }
}
