//! License threshold alert types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

/// Delivery channel of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    Email,
    Syslog,
}

impl AlertChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertChannel::Email => "email",
            AlertChannel::Syslog => "syslog",
        }
    }
}

impl fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single threshold breach to be delivered on one channel.
///
/// Built by the evaluator, handed to the dispatcher and then dropped; alert
/// events are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// The entity (AP group hostname) whose usage breached its rule.
    pub entity: EntityId,
    /// The measured AP usage.
    pub value: i64,
    /// The threshold that was exceeded.
    pub threshold: u32,
    /// Where the alert goes.
    pub channel: AlertChannel,
    /// When the breach was detected.
    pub timestamp: Timestamp,
    /// Controller the usage was read from.
    pub controller: String,
}
