//! Handlers for reading and applying the monitor configuration.

use axum::extract::State;
use axum::Json;
use licmon_core::config::MonitorConfig;
use licmon_core::error::CoreError;
use licmon_poller::{ActiveConfig, StartOutcome};
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// What happened to the poller when a configuration was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerAction {
    /// The poll loop was (re)started with the new configuration.
    Started,
    /// Another process holds the poller lock.
    LockBusy,
    /// No controller address is configured; the loop was left as is.
    NotStarted,
}

impl From<StartOutcome> for PollerAction {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started => PollerAction::Started,
            StartOutcome::LockBusy => PollerAction::LockBusy,
        }
    }
}

/// Result of applying a configuration.
#[derive(Debug, Serialize)]
pub struct AppliedConfig {
    pub config: MonitorConfig,
    pub poller: PollerAction,
}

/// GET /api/config
///
/// The active configuration with passwords redacted.
pub async fn get_config(State(state): State<AppState>) -> Json<DataResponse<MonitorConfig>> {
    Json(DataResponse {
        data: state.monitor.config().await.redacted(),
    })
}

/// POST /api/config
///
/// Replace the configuration. Alert rules are kept from the active
/// configuration and redacted passwords keep their stored value. The new
/// configuration is written to disk before it goes live; when a controller
/// address is set the poller is then restarted with it.
pub async fn update_config(
    State(state): State<AppState>,
    Json(input): Json<MonitorConfig>,
) -> AppResult<Json<DataResponse<AppliedConfig>>> {
    let _writes = state.config_writes.lock().await;

    let previous = state.monitor.config().await;
    let config = input.with_secrets_from(&previous).with_rules_from(&previous);
    config.validate()?;
    let active = ActiveConfig::new(config.clone()).map_err(|e| {
        CoreError::Validation(format!("Invalid notification settings: {e}"))
    })?;

    state.config_store.save(&config).await?;

    let poller: PollerAction = if config.has_controller() {
        state.scheduler.start(active).await?.into()
    } else {
        state.scheduler.configure(active).await;
        PollerAction::NotStarted
    };
    tracing::info!(
        controller = %config.controller_ip,
        poller = ?poller,
        "Configuration applied"
    );

    Ok(Json(DataResponse {
        data: AppliedConfig {
            config: config.redacted(),
            poller,
        },
    }))
}
