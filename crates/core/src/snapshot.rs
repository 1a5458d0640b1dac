//! Point-in-time license usage snapshots.
//!
//! A [`UsageSnapshot`] keeps the controller's responses in their original
//! shape (pools keyed by name, each a list of rows) so a persisted record
//! can be replayed or audited without loss. Typed views are computed on
//! demand by [`UsageSnapshot::usage_pools`] and
//! [`UsageSnapshot::summary_entries`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Pools whose name starts with this prefix carry per-entity AP usage.
pub const USAGE_POOL_PREFIX: &str = "License Clients License Usage for pool";

/// Hostname of the synthetic aggregate row in every pool.
pub const TOTAL_ROW: &str = "TOTAL";

/// Row key holding the entity identifier.
pub const HOSTNAME_KEY: &str = "Hostname";

/// Row key holding the AP license count.
pub const AP_KEY: &str = "AP";

/// Immutable result of one successful poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// When the cycle completed.
    pub captured_at: Timestamp,
    /// Address of the controller that produced the data.
    pub controller: String,
    /// Raw `show license-usage` response.
    pub license_usage: Map<String, Value>,
    /// Raw `show license summary` response; `{}` when the command failed.
    #[serde(default = "empty_object")]
    pub license_summary: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl UsageSnapshot {
    /// Build a snapshot from the two command responses.
    ///
    /// The usage response must be a JSON object; anything else means the
    /// controller answered with something other than a usage listing.
    pub fn new(
        controller: impl Into<String>,
        license_usage: Value,
        license_summary: Option<Value>,
    ) -> Result<Self, CoreError> {
        let Value::Object(license_usage) = license_usage else {
            return Err(CoreError::MalformedResponse(
                "license usage response is not an object".to_string(),
            ));
        };
        Ok(Self {
            captured_at: Utc::now(),
            controller: controller.into(),
            license_usage,
            license_summary: license_summary.unwrap_or_else(empty_object),
        })
    }

    /// Pools that follow the per-entity usage naming convention, with their
    /// raw rows. Pools whose value is not a list yield no rows.
    pub fn usage_pools(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.license_usage
            .iter()
            .filter(|(name, _)| name.starts_with(USAGE_POOL_PREFIX))
            .map(|(name, rows)| {
                let rows = rows.as_array().map(Vec::as_slice).unwrap_or(&[]);
                (name.as_str(), rows)
            })
    }

    /// License summary entries (`_data[].License`) of the summary section.
    pub fn summary_entries(&self) -> Vec<LicenseSummary> {
        self.license_summary
            .get("_data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("License"))
                    .map(LicenseSummary::from_value)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// LicenseSummary
// ---------------------------------------------------------------------------

/// One license type line of the summary section.
///
/// Values are kept as the controller printed them; `N/A` stands in for
/// missing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseSummary {
    pub license_type: String,
    pub used: String,
    pub total: String,
    pub available: String,
}

impl LicenseSummary {
    fn from_value(value: &Value) -> Self {
        Self {
            license_type: display_field(value, "Type"),
            used: display_field(value, "Used"),
            total: display_field(value, "Total"),
            available: display_field(value, "Available"),
        }
    }

    /// Used / total as a percentage rounded to two decimals. Malformed
    /// counts or a non-positive total yield `0.0`.
    pub fn usage_percent(&self) -> f64 {
        usage_percentage(&self.used, &self.total)
    }
}

fn display_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Percentage of `used` over `total`, rounded to two decimals.
pub fn usage_percentage(used: &str, total: &str) -> f64 {
    let (Ok(used), Ok(total)) = (used.trim().parse::<i64>(), total.trim().parse::<i64>()) else {
        return 0.0;
    };
    if total <= 0 {
        return 0.0;
    }
    let percent = used as f64 / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn sample() -> UsageSnapshot {
        UsageSnapshot::new(
            "10.0.60.60",
            json!({
                "License Clients License Usage for pool default": [
                    {"Hostname": "ap-01", "AP": "12", "PEF": "12"},
                    {"Hostname": "TOTAL", "AP": "12", "PEF": "12"}
                ],
                "_meta": ["Hostname", "AP", "PEF"]
            }),
            Some(json!({
                "_data": [
                    {"License": {"Type": "AP", "Used": "12", "Total": "64", "Available": "52"}},
                    {"License": {"Type": "PEF", "Used": 3, "Total": 0}},
                    {"Other": {}}
                ]
            })),
        )
        .unwrap()
    }

    #[test]
    fn only_usage_pools_are_listed() {
        let snap = sample();
        let pools: Vec<_> = snap.usage_pools().collect();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].0, "License Clients License Usage for pool default");
        assert_eq!(pools[0].1.len(), 2);
    }

    #[test]
    fn non_object_usage_is_rejected() {
        assert_matches!(
            UsageSnapshot::new("c", json!([1, 2]), None),
            Err(CoreError::MalformedResponse(_))
        );
    }

    #[test]
    fn missing_summary_becomes_empty_object() {
        let snap = UsageSnapshot::new("c", json!({}), None).unwrap();
        assert_eq!(snap.license_summary, json!({}));
        assert!(snap.summary_entries().is_empty());
    }

    #[test]
    fn summary_entries_are_parsed_leniently() {
        let entries = sample().summary_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].license_type, "AP");
        assert_eq!(entries[0].usage_percent(), 18.75);
        assert_eq!(entries[1].used, "3");
        assert_eq!(entries[1].available, "N/A");
        assert_eq!(entries[1].usage_percent(), 0.0);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(usage_percentage("1", "3"), 33.33);
        assert_eq!(usage_percentage("x", "3"), 0.0);
        assert_eq!(usage_percentage("5", "-1"), 0.0);
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let snap = sample();
        let text = serde_json::to_string_pretty(&snap).unwrap();
        let back: UsageSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snap);
    }
}
