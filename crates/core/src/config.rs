//! Monitor configuration document.
//!
//! [`MonitorConfig`] mirrors the JSON document kept in the configuration
//! store. Field names match the stored keys so that existing
//! `config.json` files load unchanged. Every field has a default, which
//! means a partial or empty document is still a valid configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

/// Default poll interval in minutes.
pub const DEFAULT_POLLING_INTERVAL_MINUTES: u64 = 86_400;

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default syslog port.
pub const DEFAULT_SYSLOG_PORT: u16 = 514;

/// Placeholder substituted for secrets in [`MonitorConfig::redacted`].
pub const REDACTED: &str = "********";

// ---------------------------------------------------------------------------
// AlertRule
// ---------------------------------------------------------------------------

/// Per-entity alerting rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRule {
    /// Usage above this value raises an alert. `0` disables the rule.
    pub threshold: u32,
    /// Deliver breaches of this rule by email.
    pub email_enabled: bool,
    /// Deliver breaches of this rule by syslog.
    pub syslog_enabled: bool,
}

impl AlertRule {
    /// Whether the rule can ever produce an alert.
    pub fn is_active(&self) -> bool {
        self.threshold > 0
    }
}

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

/// The whole monitor configuration.
///
/// Replaced as a unit: the poller and request handlers only ever see a
/// complete value, never one that is half-updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Controller address (IP or hostname, optionally with a scheme).
    pub controller_ip: String,
    pub username: String,
    pub password: String,
    /// Minutes between two poll cycles.
    pub polling_interval: u64,
    /// Send a usage report after every successful cycle.
    pub enable_notifications: bool,

    pub smtp_enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from: String,
    /// Comma-separated recipient list.
    pub smtp_to: String,

    pub syslog_enabled: bool,
    pub syslog_server: String,
    pub syslog_port: u16,

    /// Alert rules keyed by entity identifier.
    pub alert_settings: BTreeMap<EntityId, AlertRule>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            controller_ip: String::new(),
            username: String::new(),
            password: String::new(),
            polling_interval: DEFAULT_POLLING_INTERVAL_MINUTES,
            enable_notifications: false,
            smtp_enabled: false,
            smtp_server: String::new(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_from: String::new(),
            smtp_to: String::new(),
            syslog_enabled: false,
            syslog_server: String::new(),
            syslog_port: DEFAULT_SYSLOG_PORT,
            alert_settings: BTreeMap::new(),
        }
    }
}

impl MonitorConfig {
    /// True when a controller address has been configured.
    pub fn has_controller(&self) -> bool {
        !self.controller_ip.trim().is_empty()
    }

    /// True when address, username and password are all present, i.e. a
    /// poll cycle can be attempted.
    pub fn has_controller_credentials(&self) -> bool {
        self.has_controller() && !self.username.is_empty() && !self.password.is_empty()
    }

    /// The poll interval as a [`Duration`]. A zero interval is clamped to
    /// one minute so the poller can never spin.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval.max(1).saturating_mul(60))
    }

    /// Recipients parsed from the comma-separated `smtp_to` field.
    pub fn smtp_recipients(&self) -> Vec<String> {
        self.smtp_to
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Carry the alert rules of `previous` over into this configuration.
    ///
    /// Used when a new configuration is applied from a form that does not
    /// include rules; rules are only changed through [`Self::set_rule`].
    pub fn with_rules_from(mut self, previous: &MonitorConfig) -> Self {
        self.alert_settings = previous.alert_settings.clone();
        self
    }

    /// Put back secrets that a client echoed as [`REDACTED`].
    ///
    /// Clients edit the redacted view; an unchanged placeholder means "keep
    /// the stored value".
    pub fn with_secrets_from(mut self, previous: &MonitorConfig) -> Self {
        if self.password == REDACTED {
            self.password = previous.password.clone();
        }
        if self.smtp_password == REDACTED {
            self.smtp_password = previous.smtp_password.clone();
        }
        self
    }

    /// Insert or overwrite the rule for `entity`.
    pub fn set_rule(&mut self, entity: impl Into<EntityId>, rule: AlertRule) {
        self.alert_settings.insert(entity.into(), rule);
    }

    /// Copy of the configuration with every secret replaced by [`REDACTED`].
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = REDACTED.to_string();
        }
        if !copy.smtp_password.is_empty() {
            copy.smtp_password = REDACTED.to_string();
        }
        copy
    }

    /// Check the settings the poller and dispatcher rely on.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.polling_interval == 0 {
            return Err(CoreError::Validation(
                "polling_interval must be at least 1 minute".to_string(),
            ));
        }
        if self.smtp_enabled {
            if self.smtp_server.trim().is_empty() {
                return Err(CoreError::Validation(
                    "smtp_server is required when SMTP is enabled".to_string(),
                ));
            }
            if self.smtp_port == 0 {
                return Err(CoreError::Validation("smtp_port must be non-zero".to_string()));
            }
            if self.smtp_from.trim().is_empty() {
                return Err(CoreError::Validation(
                    "smtp_from is required when SMTP is enabled".to_string(),
                ));
            }
            if self.smtp_recipients().is_empty() {
                return Err(CoreError::Validation(
                    "smtp_to needs at least one recipient".to_string(),
                ));
            }
        }
        if self.syslog_enabled {
            if self.syslog_server.trim().is_empty() {
                return Err(CoreError::Validation(
                    "syslog_server is required when syslog is enabled".to_string(),
                ));
            }
            if self.syslog_port == 0 {
                return Err(CoreError::Validation("syslog_port must be non-zero".to_string()));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
