//! One poll cycle's worth of controller traffic.

use licmon_core::config::MonitorConfig;
use licmon_core::snapshot::UsageSnapshot;

use crate::error::ControllerError;
use crate::session::DeviceSessionClient;

/// Command listing per-entity license usage.
pub const PRIMARY_COMMAND: &str = "show license-usage";

/// Command listing the per-type license summary.
pub const SUMMARY_COMMAND: &str = "show license summary";

/// Where and as whom to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerTarget {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl ControllerTarget {
    /// Target from a configuration, or `None` when credentials are missing.
    pub fn from_config(config: &MonitorConfig) -> Option<Self> {
        config.has_controller_credentials().then(|| Self {
            address: config.controller_ip.trim().to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

/// Log in, run the usage and summary commands, log out, and build the
/// snapshot.
///
/// A failing summary command degrades to an empty summary. Logout is
/// best-effort: its failure is logged and does not fail the call. When the
/// usage command fails the session is still closed before the error is
/// returned.
pub async fn collect_license_usage<C: DeviceSessionClient>(
    client: &C,
    target: &ControllerTarget,
) -> Result<UsageSnapshot, ControllerError> {
    let session = client
        .authenticate(&target.address, &target.username, &target.password)
        .await?;

    let usage = match client.execute_command(&session, PRIMARY_COMMAND).await {
        Ok(usage) => usage,
        Err(e) => {
            if let Err(logout_err) = client.terminate_session(session).await {
                tracing::warn!(error = %logout_err, "Logout after failed usage command failed");
            }
            return Err(e);
        }
    };

    let summary = match client.execute_command(&session, SUMMARY_COMMAND).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(error = %e, "License summary unavailable, continuing without it");
            None
        }
    };

    if let Err(e) = client.terminate_session(session).await {
        tracing::warn!(error = %e, address = %target.address, "Controller logout failed");
    }

    Ok(UsageSnapshot::new(&target.address, usage, summary)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_requires_all_credentials() {
        let mut cfg = MonitorConfig {
            controller_ip: " 10.0.60.60 ".to_string(),
            username: "admin".to_string(),
            ..Default::default()
        };
        assert!(ControllerTarget::from_config(&cfg).is_none());

        cfg.password = "secret".to_string();
        let target = ControllerTarget::from_config(&cfg).unwrap();
        assert_eq!(target.address, "10.0.60.60");
        assert_eq!(target.username, "admin");
    }
}
