use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use licmon_core::error::CoreError;
use licmon_events::DispatchError;
use licmon_poller::{CycleError, SchedulerError, StoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of the workspace crates and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses of the form `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A poll cycle requested through the API failed.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A manual notification could not be delivered.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal(error: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %error, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::MalformedResponse(msg) => {
                    (StatusCode::BAD_GATEWAY, "CONTROLLER_ERROR", msg.clone())
                }
            },

            // --- Poll cycle ---
            AppError::Cycle(CycleError::NotConfigured) => (
                StatusCode::CONFLICT,
                "NOT_CONFIGURED",
                self.to_string(),
            ),
            AppError::Cycle(CycleError::Controller(e)) => {
                tracing::warn!(error = %e, "Controller request failed");
                (StatusCode::BAD_GATEWAY, "CONTROLLER_ERROR", e.to_string())
            }

            // --- Scheduler ---
            AppError::Scheduler(SchedulerError::Lock(e)) => internal(e),

            // --- Notifications ---
            AppError::Dispatch(DispatchError::ChannelDisabled(_)) => (
                StatusCode::BAD_REQUEST,
                "CHANNEL_DISABLED",
                self.to_string(),
            ),
            AppError::Dispatch(e) => (StatusCode::BAD_GATEWAY, "DELIVERY_FAILED", e.to_string()),

            // --- Storage ---
            AppError::Store(e) => internal(e),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
