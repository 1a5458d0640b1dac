//! Handlers for alert rules and manual alerts.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use licmon_core::alert::{AlertChannel, AlertEvent};
use licmon_core::config::AlertRule;
use licmon_core::types::EntityId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for saving one alert rule.
#[derive(Debug, Deserialize)]
pub struct SaveAlertRule {
    pub hostname: String,
    #[serde(default)]
    pub threshold: u32,
    #[serde(default)]
    pub email_enabled: bool,
    #[serde(default)]
    pub syslog_enabled: bool,
}

/// Request body for a manual alert.
#[derive(Debug, Deserialize)]
pub struct SendAlertRequest {
    pub hostname: String,
    pub ap_value: i64,
    pub threshold: u32,
    pub alert_type: AlertChannel,
}

fn require_hostname(hostname: &str) -> AppResult<&str> {
    let hostname = hostname.trim();
    if hostname.is_empty() {
        return Err(AppError::BadRequest("hostname is required".to_string()));
    }
    Ok(hostname)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/alert-settings
pub async fn list_alert_settings(
    State(state): State<AppState>,
) -> Json<DataResponse<BTreeMap<EntityId, AlertRule>>> {
    Json(DataResponse {
        data: state.monitor.config().await.alert_settings,
    })
}

/// POST /api/alert-settings
///
/// Insert or overwrite the rule of one entity. The updated configuration
/// is persisted first and only then made live. Returns the full rule map.
pub async fn save_alert_setting(
    State(state): State<AppState>,
    Json(input): Json<SaveAlertRule>,
) -> AppResult<Json<DataResponse<BTreeMap<EntityId, AlertRule>>>> {
    let hostname = require_hostname(&input.hostname)?;
    let rule = AlertRule {
        threshold: input.threshold,
        email_enabled: input.email_enabled,
        syslog_enabled: input.syslog_enabled,
    };

    let _writes = state.config_writes.lock().await;
    let mut config = state.monitor.config().await;
    config.set_rule(hostname, rule.clone());
    state.config_store.save(&config).await?;
    let config = state.monitor.save_rule(hostname, rule.clone()).await;

    tracing::info!(
        entity = hostname,
        threshold = rule.threshold,
        email = rule.email_enabled,
        syslog = rule.syslog_enabled,
        "Alert rule saved"
    );
    Ok(Json(DataResponse {
        data: config.alert_settings,
    }))
}

/// POST /api/send-alert
///
/// Deliver an operator-composed alert on one channel.
pub async fn send_alert(
    State(state): State<AppState>,
    Json(input): Json<SendAlertRequest>,
) -> AppResult<Json<DataResponse<AlertEvent>>> {
    let hostname = require_hostname(&input.hostname)?;
    let active = state.monitor.active().await;

    let event = AlertEvent {
        entity: hostname.to_string(),
        value: input.ap_value,
        threshold: input.threshold,
        channel: input.alert_type,
        timestamp: Utc::now(),
        controller: active.config.controller_ip.clone(),
    };
    active.dispatcher.dispatch_alert(&event).await?;

    Ok(Json(DataResponse { data: event }))
}
