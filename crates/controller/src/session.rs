//! The device session seam.

use std::future::Future;

use crate::error::ControllerError;

/// An authenticated session on a controller.
///
/// Returned by [`DeviceSessionClient::authenticate`] and consumed by
/// [`DeviceSessionClient::terminate_session`]. The token is opaque to
/// callers.
#[derive(Debug, Clone)]
pub struct Session {
    address: String,
    token: String,
    pub(crate) http: Option<reqwest::Client>,
}

impl Session {
    /// Create a session handle for `address` identified by `token`.
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: token.into(),
            http: None,
        }
    }

    pub(crate) fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// The controller address this session belongs to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The opaque session token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Authenticated command execution against a controller.
///
/// Every call sequence is `authenticate`, then any number of
/// `execute_command`, then `terminate_session`. Implementations keep no
/// state between sequences.
pub trait DeviceSessionClient: Send + Sync + 'static {
    /// Log in and return a session.
    fn authenticate(
        &self,
        address: &str,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, ControllerError>> + Send;

    /// Run a free-text command and return the controller's JSON answer.
    fn execute_command(
        &self,
        session: &Session,
        command: &str,
    ) -> impl Future<Output = Result<serde_json::Value, ControllerError>> + Send;

    /// Log out. Callers treat failures as best-effort.
    fn terminate_session(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<(), ControllerError>> + Send;
}
