//! Handlers for license data, manual refresh and poller status.

use axum::extract::State;
use axum::Json;
use licmon_core::config::MonitorConfig;
use licmon_core::snapshot::UsageSnapshot;
use licmon_core::types::Timestamp;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One license type of the summary with its computed usage.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub license_type: String,
    pub used: String,
    pub total: String,
    pub available: String,
    pub usage_percent: f64,
}

fn summary_rows(snapshot: &UsageSnapshot) -> Vec<SummaryRow> {
    snapshot
        .summary_entries()
        .into_iter()
        .map(|entry| SummaryRow {
            usage_percent: entry.usage_percent(),
            license_type: entry.license_type,
            used: entry.used,
            total: entry.total,
            available: entry.available,
        })
        .collect()
}

/// The latest snapshot with its summary, plus the redacted configuration.
#[derive(Debug, Serialize)]
pub struct LicenseView {
    pub snapshot: Option<UsageSnapshot>,
    pub summary: Vec<SummaryRow>,
    pub config: MonitorConfig,
}

/// Poller status.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub scheduler: &'static str,
    pub active_loops: usize,
    pub last_update: Option<Timestamp>,
    pub config_loaded: bool,
    pub polling_interval: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/license
///
/// The most recent snapshot (or `null` before the first cycle) and the
/// configuration with passwords redacted.
pub async fn get_license(State(state): State<AppState>) -> Json<DataResponse<LicenseView>> {
    let snapshot = state.monitor.latest_snapshot().await;
    let config = state.monitor.config().await.redacted();

    let summary = snapshot.as_deref().map(summary_rows).unwrap_or_default();
    Json(DataResponse {
        data: LicenseView {
            snapshot: snapshot.as_deref().cloned(),
            summary,
            config,
        },
    })
}

/// POST /api/refresh
///
/// Run one poll cycle now and return the fresh snapshot.
pub async fn refresh(State(state): State<AppState>) -> AppResult<Json<DataResponse<LicenseView>>> {
    let snapshot = state.scheduler.refresh_now().await?;
    tracing::info!(controller = %snapshot.controller, "Manual refresh completed");

    Ok(Json(DataResponse {
        data: LicenseView {
            summary: summary_rows(&snapshot),
            snapshot: Some(UsageSnapshot::clone(&snapshot)),
            config: state.monitor.config().await.redacted(),
        },
    }))
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<DataResponse<StatusView>> {
    let config = state.monitor.config().await;
    let last_update = state
        .monitor
        .latest_snapshot()
        .await
        .map(|snapshot| snapshot.captured_at);

    Json(DataResponse {
        data: StatusView {
            scheduler: state.scheduler.state().as_str(),
            active_loops: state.scheduler.active_loops(),
            last_update,
            config_loaded: config.has_controller(),
            polling_interval: config.polling_interval,
        },
    })
}
