/// Errors from the controller management API.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The controller returned a non-2xx status code.
    #[error("Controller API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Login was answered but refused.
    #[error("Authentication rejected: {0}")]
    Authentication(String),

    /// Logout was answered but refused.
    #[error("Logout rejected: {0}")]
    Logout(String),

    /// The session was not opened by this client and carries no HTTP
    /// connection state.
    #[error("Session for {0} was not opened by this client")]
    SessionNotOpened(String),

    /// A show command failed.
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// The controller answered with data the monitor cannot use.
    #[error(transparent)]
    Malformed(#[from] licmon_core::error::CoreError),
}
