//! Route definitions for alert rules and manual alerts.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// ```text
/// GET  /alert-settings   -> list_alert_settings
/// POST /alert-settings   -> save_alert_setting
/// POST /send-alert       -> send_alert
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/alert-settings",
            get(alerts::list_alert_settings).post(alerts::save_alert_setting),
        )
        .route("/send-alert", post(alerts::send_alert))
}
