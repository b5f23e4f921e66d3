// Decodes inbound socket payloads into canonical alerts
//
// A message holds one record or an array of records. Each record keeps its
// fields either under `data` or at the top level; nested values win and the
// top level is the fallback.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::models::{AlertItem, RiskLevel, PLACEHOLDER, UNKNOWN_NAME};
use crate::common::error::PayloadError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Batch(Vec<Value>),
    Single(Value),
}

enum Record<'a> {
    Nested {
        data: &'a Map<String, Value>,
        outer: &'a Map<String, Value>,
    },
    Flat(&'a Map<String, Value>),
}

const ID_KEYS: &[&str] = &["id", "_id", "alert_id"];
const LEVEL_KEYS: &[&str] = &["level", "type", "risk"];
const TIME_KEYS: &[&str] = &["occurred_at", "created_at", "time", "timestamp"];
const READ_KEYS: &[&str] = &["read", "is_read"];

pub const SYNTHETIC_ID_PREFIX: &str = "local-";

impl<'a> Record<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        let outer = value.as_object()?;
        match outer.get("data").and_then(Value::as_object) {
            Some(data) => Some(Record::Nested { data, outer }),
            None => Some(Record::Flat(outer)),
        }
    }

    fn field(&self, key: &str) -> Option<&'a Value> {
        let present = |map: &'a Map<String, Value>| map.get(key).filter(|v| !v.is_null());
        match *self {
            Record::Nested { data, outer } => present(data).or_else(|| present(outer)),
            Record::Flat(map) => present(map),
        }
    }

    // First present key wins
    fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter().find_map(|key| self.field(key))
    }

    fn text(&self, key: &str) -> Option<String> {
        self.field(key).and_then(value_text)
    }
}

/// Parses one socket message. Records that are not objects or carry no
/// `user_id` are skipped; a message that is not JSON at all is an error.
pub fn normalize(text: &str, received_at: DateTime<Utc>) -> Result<Vec<AlertItem>, PayloadError> {
    let payload: Payload = serde_json::from_str(text)?;
    let values = match payload {
        Payload::Batch(values) => values,
        Payload::Single(value @ Value::Object(_)) => vec![value],
        Payload::Single(_) => return Err(PayloadError::Shape("expected an object or an array")),
    };

    let alerts = values
        .iter()
        .filter_map(|value| {
            let alert = normalize_record(value, received_at);
            if alert.is_none() {
                debug!("Skipping record without alert fields");
            }
            alert
        })
        .collect();
    Ok(alerts)
}

/// Builds an alert from one raw record, applying every default
pub fn normalize_record(value: &Value, received_at: DateTime<Utc>) -> Option<AlertItem> {
    let record = Record::of(value)?;
    let user_id = record.text("user_id").filter(|id| !id.is_empty())?;

    let stamped = record.first(TIME_KEYS).and_then(parse_timestamp);

    let level = record
        .first(LEVEL_KEYS)
        .and_then(Value::as_str)
        .map(RiskLevel::parse)
        .unwrap_or_default();

    let mut alert = AlertItem {
        id: String::new(),
        user_id,
        name: record
            .text("name")
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        level,
        depression_score: record.field("depression_score").and_then(as_i64).unwrap_or(0),
        sentiment_score: record.field("sentiment_score").and_then(as_f64).unwrap_or(0.0),
        sentiment_label: record
            .text("sentiment_label")
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        disease: record
            .text("disease")
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        occurred_at: stamped.unwrap_or(received_at),
        read: record
            .first(READ_KEYS)
            .and_then(Value::as_bool)
            .unwrap_or(false),
        synthetic: false,
    };

    match record
        .first(ID_KEYS)
        .and_then(value_text)
        .filter(|id| !id.is_empty())
    {
        Some(id) => alert.id = id,
        None => {
            alert.id = content_id(&alert, stamped);
            alert.synthetic = true;
        }
    }
    Some(alert)
}

/// Id for a record the server sent without one. It depends only on the
/// record's content (and its own timestamp, when it has one), never on the
/// receipt time, so the same record always maps to the same alert.
pub fn content_id(alert: &AlertItem, stamped: Option<DateTime<Utc>>) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        alert.user_id,
        alert.level,
        alert.depression_score,
        alert.sentiment_score,
        alert.sentiment_label,
        alert.disease,
        stamped.map(|t| t.timestamp_millis()).unwrap_or_default(),
    );
    format!(
        "{}{}",
        SYNTHETIC_ID_PREFIX,
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    )
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339, naive date-times (taken as UTC) and epoch seconds or millis
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => {
            let raw = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            // Anything this large is milliseconds
            if raw.abs() >= 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
