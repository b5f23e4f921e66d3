// src/admin/models.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::alerts::models::{RiskLevel, PLACEHOLDER, UNKNOWN_NAME};

// Status board models

/// One monitored person as listed by `/api/allstatus`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStatusItem")]
pub struct StatusItem {
    pub user_id: String,
    pub name: String,
    pub depression_score: i64,
    pub sentiment_label: String,
    /// 0..1
    pub sentiment_score: f64,
    pub disease: String,
    pub tier: RiskLevel,
    /// Display-only freshness hint such as `24분 전`
    pub time: Option<String>,
}

// The server has named the tier field `type`, `risk` and `level` at
// different times
#[derive(Deserialize)]
struct RawStatusItem {
    #[serde(default, alias = "_id")]
    user_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    depression_score: Option<f64>,
    #[serde(default)]
    sentiment_label: Option<String>,
    #[serde(default)]
    sentiment_score: Option<f64>,
    #[serde(default)]
    disease: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    risk: Option<String>,
    #[serde(default, alias = "tier")]
    level: Option<String>,
    #[serde(default)]
    time: Option<String>,
}

impl From<RawStatusItem> for StatusItem {
    fn from(raw: RawStatusItem) -> Self {
        let tier = raw
            .kind
            .or(raw.risk)
            .or(raw.level)
            .as_deref()
            .map(RiskLevel::parse)
            .unwrap_or_default();

        Self {
            user_id: raw.user_id,
            name: raw
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            depression_score: raw.depression_score.map(|d| d.round() as i64).unwrap_or(0),
            sentiment_label: raw.sentiment_label.unwrap_or_else(|| PLACEHOLDER.to_string()),
            sentiment_score: raw.sentiment_score.unwrap_or(0.0),
            disease: raw.disease.unwrap_or_else(|| PLACEHOLDER.to_string()),
            tier,
            time: raw.time,
        }
    }
}

impl StatusItem {
    pub fn sentiment_percent(&self) -> i64 {
        (self.sentiment_score * 100.0).round() as i64
    }
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub high: usize,
    pub middle: usize,
    pub safe: usize,
}

// User detail models

/// Full profile returned by `/api/userdetail`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(default, alias = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// ISO date of birth
    #[serde(default)]
    pub birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub depression_score: i64,
    #[serde(default)]
    pub sentiment_label: String,
    #[serde(default)]
    pub sentiment_score: f64,
    #[serde(default)]
    pub disease: String,
    #[serde(default, deserialize_with = "lenient_tier")]
    pub risk: RiskLevel,
    #[serde(default)]
    pub diagnosed_at: Option<String>,
}

fn lenient_tier<'de, D>(deserializer: D) -> Result<RiskLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(RiskLevel::parse).unwrap_or_default())
}

/// Nearest emergency facilities for an address. Each side is the facility
/// record paired with its distance in kilometres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nearby {
    pub hospital: (Facility, f64),
    pub firehouse: (Facility, f64),
}

/// Facility record as published in the public datasets, keyed in Korean
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facility(pub Map<String, Value>);

impl Facility {
    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// `요양기관명` for hospitals, `119안전센터명` or `소방서명` for fire stations
    pub fn name(&self) -> &str {
        ["요양기관명", "119안전센터명", "소방서명"]
            .iter()
            .find_map(|key| self.text(key))
            .unwrap_or(PLACEHOLDER)
    }

    pub fn address(&self) -> &str {
        self.text("주소").unwrap_or(PLACEHOLDER)
    }

    pub fn phone(&self) -> &str {
        self.text("전화번호").unwrap_or(PLACEHOLDER)
    }
}

/// Row of the searchable user list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub user_id: String,
    pub name: String,
    pub age: Option<i32>,
    pub risk: RiskLevel,
}

impl From<&StatusItem> for Row {
    fn from(item: &StatusItem) -> Self {
        Self {
            user_id: item.user_id.clone(),
            name: item.name.clone(),
            age: None,
            risk: item.tier,
        }
    }
}

/// Korean badge text for a tier
pub fn tier_label(tier: RiskLevel) -> &'static str {
    match tier {
        RiskLevel::High => "고위험",
        RiskLevel::Middle => "중위험",
        RiskLevel::None => "정상",
    }
}
