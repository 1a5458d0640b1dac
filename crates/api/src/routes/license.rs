//! Route definitions for license data and the poller.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::license;
use crate::state::AppState;

/// ```text
/// GET  /license   -> get_license
/// POST /refresh   -> refresh
/// GET  /status    -> get_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/license", get(license::get_license))
        .route("/refresh", post(license::refresh))
        .route("/status", get(license::get_status))
}
