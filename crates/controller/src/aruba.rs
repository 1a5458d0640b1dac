//! REST client for the Aruba controller management API.
//!
//! Wraps the `/v1/api/login`, `/v1/configuration/showcommand` and
//! `/v1/api/logout` endpoints using [`reqwest`]. Every session gets its own
//! HTTP client with a private cookie jar, so the client itself stays
//! stateless between call sequences.

use std::time::Duration;

use serde_json::Value;

use crate::error::ControllerError;
use crate::session::{DeviceSessionClient, Session};

/// Management API port used when the address carries no scheme.
pub const DEFAULT_API_PORT: u16 = 4343;

/// HTTP request timeout for a single controller call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`ArubaClient`].
#[derive(Debug, Clone)]
pub struct ArubaClientConfig {
    /// Port of the management API (default `4343`).
    pub api_port: u16,
    /// Verify the controller's TLS certificate. Controllers usually ship
    /// self-signed certificates, so this is off by default.
    pub verify_tls: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ArubaClientConfig {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            verify_tls: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// HTTP client for Aruba controllers.
#[derive(Debug, Clone, Default)]
pub struct ArubaClient {
    config: ArubaClientConfig,
}

impl ArubaClient {
    pub fn new(config: ArubaClientConfig) -> Self {
        Self { config }
    }

    /// Base API URL for `address`.
    ///
    /// A bare host becomes `https://{host}:{api_port}/v1`; an address that
    /// already has a scheme is used as the origin verbatim.
    pub fn base_url(&self, address: &str) -> String {
        let address = address.trim().trim_end_matches('/');
        if address.contains("://") {
            format!("{address}/v1")
        } else {
            format!("https://{address}:{}/v1", self.config.api_port)
        }
    }

    fn build_http(&self) -> Result<reqwest::Client, ControllerError> {
        Ok(reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .timeout(self.config.request_timeout)
            .build()?)
    }

    /// The cookie-carrying client of a session opened by [`Self::authenticate`].
    fn session_http(session: &Session) -> Result<reqwest::Client, ControllerError> {
        session
            .http
            .clone()
            .ok_or_else(|| ControllerError::SessionNotOpened(session.address().to_string()))
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ControllerError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ControllerError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body.
    async fn parse_response(response: reqwest::Response) -> Result<Value, ControllerError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<Value>().await?)
    }
}

/// Whether `_global_result.status` reports success. The controller sends
/// the code as a string, but a numeric `0` is accepted too.
fn global_status_ok(body: &Value) -> bool {
    match body.get("_global_result").and_then(|r| r.get("status")) {
        Some(Value::String(s)) => s == "0",
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        _ => false,
    }
}

/// Human-readable reason from a refused `_global_result`.
fn global_status_reason(body: &Value) -> String {
    body.get("_global_result")
        .and_then(|r| r.get("status_str"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

impl DeviceSessionClient for ArubaClient {
    async fn authenticate(
        &self,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<Session, ControllerError> {
        let http = self.build_http()?;
        let response = http
            .post(format!("{}/api/login", self.base_url(address)))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let body = Self::parse_response(response).await?;

        if !global_status_ok(&body) {
            return Err(ControllerError::Authentication(global_status_reason(&body)));
        }

        let token = body
            .get("_global_result")
            .and_then(|r| r.get("UIDARUBA"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ControllerError::Authentication("login response carries no UIDARUBA".to_string())
            })?;

        tracing::debug!(address, "Controller login succeeded");
        Ok(Session::new(address, token).with_http(http))
    }

    async fn execute_command(&self, session: &Session, command: &str) -> Result<Value, ControllerError> {
        let http = Self::session_http(session)?;
        let response = http
            .get(format!(
                "{}/configuration/showcommand",
                self.base_url(session.address())
            ))
            .query(&[("command", command), ("UIDARUBA", session.token())])
            .send()
            .await?;

        Self::parse_response(response)
            .await
            .map_err(|e| ControllerError::Command {
                command: command.to_string(),
                message: e.to_string(),
            })
    }

    async fn terminate_session(&self, session: Session) -> Result<(), ControllerError> {
        let http = Self::session_http(&session)?;
        let response = http
            .get(format!("{}/api/logout", self.base_url(session.address())))
            .send()
            .await?;
        let body = Self::parse_response(response).await?;

        if !global_status_ok(&body) {
            return Err(ControllerError::Logout(global_status_reason(&body)));
        }
        tracing::debug!(address = session.address(), "Controller logout succeeded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
