//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNKNOWN_NAME: &str = "이름 미상";
pub const PLACEHOLDER: &str = "-";

/// Categorical severity computed server-side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Middle,
    #[default]
    None,
}

impl RiskLevel {
    /// Accepts current tiers and the legacy `critical`/`medium`/`low` names.
    /// Anything unrecognized is treated as no risk.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" | "critical" => RiskLevel::High,
            "middle" | "medium" => RiskLevel::Middle,
            _ => RiskLevel::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Middle => "middle",
            RiskLevel::None => "none",
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, RiskLevel::High)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One risk alert as held by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub level: RiskLevel,
    pub depression_score: i64,
    /// 0..1
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub disease: String,
    pub occurred_at: DateTime<Utc>,
    /// Client-local, reconciled through per-id acknowledgements
    pub read: bool,
    /// The id was derived on the client; the server cannot acknowledge it
    #[serde(default)]
    pub synthetic: bool,
}

impl AlertItem {
    /// Sentiment score on a 0..100 scale, rounded
    pub fn sentiment_percent(&self) -> i64 {
        (self.sentiment_score * 100.0).round() as i64
    }

    pub fn headline(&self) -> String {
        format!(
            "{} 우울도 {}, 감정점수 {}점",
            self.name,
            self.depression_score,
            self.sentiment_percent()
        )
    }
}
