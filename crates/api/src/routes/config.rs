use axum::routing::get;
use axum::Router;

use crate::handlers::config;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/config", get(config::get_config).post(config::update_config))
}
