/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Entity identifier as reported by the controller (the AP group hostname).
pub type EntityId = String;
