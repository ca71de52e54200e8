use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a timestamp value that may be epoch milliseconds or an RFC3339 string
pub fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        // Assume it's a Unix timestamp in milliseconds
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => s.parse::<DateTime<Utc>>().ok(),
        _ => None,
    }
}

/// Timestamp deserializer that never fails: malformed or missing values become "now"
pub fn deserialize_lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_timestamp_value(&value).unwrap_or_else(|| {
        tracing::debug!(?value, "Malformed timestamp, defaulting to now");
        Utc::now()
    }))
}
