//! Web layer for the facility search server.
//!
//! Provides JSON endpoints for searching, paging and re-sorting results.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, Session};
