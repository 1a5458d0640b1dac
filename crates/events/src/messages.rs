//! Rendering of alert and usage report texts.
//!
//! The same body is used for email and syslog; syslog gets a fixed prefix
//! and is flattened to one line on send.

use std::fmt::Write as _;

use licmon_core::alert::AlertEvent;
use licmon_core::snapshot::UsageSnapshot;
use licmon_core::types::Timestamp;

/// Prefix of syslog alert messages.
pub const SYSLOG_ALERT_PREFIX: &str = "Aruba License Alert: ";

/// Prefix of syslog usage report messages.
pub const SYSLOG_REPORT_PREFIX: &str = "Aruba License Usage: ";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Subject and body of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

impl RenderedMessage {
    /// The body as a prefixed syslog line source.
    pub fn syslog_text(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.body)
    }
}

/// Alert text for one threshold breach.
pub fn render_alert(event: &AlertEvent) -> RenderedMessage {
    let body = format!(
        "License usage alert at {}\n\
         Hostname: {}\n\
         AP usage: {}\n\
         Threshold: {}\n\
         Controller: {}\n\
         Alert type: {}\n",
        format_timestamp(&event.timestamp),
        event.entity,
        event.value,
        event.threshold,
        event.controller,
        event.channel,
    );
    RenderedMessage {
        subject: format!("Aruba License Alert - {}", event.entity),
        body,
    }
}

/// License summary report for a snapshot, or `None` when the snapshot has
/// no summary entries.
pub fn render_report(snapshot: &UsageSnapshot) -> Option<RenderedMessage> {
    let entries = snapshot.summary_entries();
    if entries.is_empty() {
        return None;
    }

    let captured = format_timestamp(&snapshot.captured_at);
    let mut body = format!(
        "License usage report for controller {} at {captured}\n",
        snapshot.controller
    );
    for entry in &entries {
        // Writing to a String cannot fail.
        let _ = write!(
            body,
            "\nLicense type: {}\nUsed: {}\nTotal: {}\nAvailable: {}\nUsage: {:.2}%\n",
            entry.license_type,
            entry.used,
            entry.total,
            entry.available,
            entry.usage_percent(),
        );
    }

    Some(RenderedMessage {
        subject: format!("Aruba License Usage Report - {captured}"),
        body,
    })
}
