pub mod alerts;
pub mod config;
pub mod health;
pub mod license;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// GET  /license            -> latest snapshot and redacted configuration
/// POST /refresh            -> run one poll cycle now
/// GET  /status             -> poller state
/// GET  /config             -> redacted configuration
/// POST /config             -> apply configuration, restart poller
/// GET  /alert-settings     -> all alert rules
/// POST /alert-settings     -> save one alert rule
/// POST /send-alert         -> manual alert on one channel
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(license::router())
        .merge(config::router())
        .merge(alerts::router())
}
