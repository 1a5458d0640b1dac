//! Threshold evaluation engine for license usage.
//!
//! Pure logic: the caller passes in the snapshot and the current rule map
//! and receives the alerts to deliver. No state is kept between calls.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::alert::{AlertChannel, AlertEvent};
use crate::config::AlertRule;
use crate::snapshot::{UsageSnapshot, AP_KEY, HOSTNAME_KEY, TOTAL_ROW};
use crate::types::{EntityId, Timestamp};

/// Evaluate every usage row of `snapshot` against `rules`.
///
/// A breach (`threshold > 0 && usage > threshold`) yields one event per
/// enabled channel of the entity's rule, email before syslog. Entities
/// without a rule never alert.
pub fn evaluate(
    snapshot: &UsageSnapshot,
    rules: &BTreeMap<EntityId, AlertRule>,
    now: Timestamp,
) -> Vec<AlertEvent> {
    let mut alerts = Vec::new();
    if rules.is_empty() {
        return alerts;
    }

    for (_, rows) in snapshot.usage_pools() {
        for row in rows {
            let Some(entity) = row_entity(row) else {
                continue;
            };
            let Some(rule) = rules.get(entity) else {
                continue;
            };

            let usage = parse_usage(row.get(AP_KEY));
            if !breaches(usage, rule) {
                continue;
            }

            let channels = [
                (rule.email_enabled, AlertChannel::Email),
                (rule.syslog_enabled, AlertChannel::Syslog),
            ];
            for (_, channel) in channels.into_iter().filter(|(enabled, _)| *enabled) {
                alerts.push(AlertEvent {
                    entity: entity.to_string(),
                    value: usage,
                    threshold: rule.threshold,
                    channel,
                    timestamp: now,
                    controller: snapshot.controller.clone(),
                });
            }
        }
    }

    alerts
}

/// Whether `usage` strictly exceeds an active rule's threshold.
pub fn breaches(usage: i64, rule: &AlertRule) -> bool {
    rule.is_active() && usage > i64::from(rule.threshold)
}

/// The entity identifier of a row, or `None` for rows without one and for
/// the synthetic aggregate row.
fn row_entity(row: &Value) -> Option<&str> {
    row.get(HOSTNAME_KEY)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty() && *name != TOTAL_ROW)
}

/// Parse a usage cell. Missing or malformed values count as zero.
pub fn parse_usage(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
