// src/admin/handlers/dashboard.rs

use tracing::{info, warn};

use crate::admin::models::{BoardStats, StatusItem};
use crate::alerts::models::RiskLevel;
use crate::common::error::ApiError;
use crate::services::api_client::{ApiClient, ApiRequest};

/// GET /api/allstatus?type=all - Snapshot of every monitored person
pub async fn fetch_all_status(api: &ApiClient) -> Result<Vec<StatusItem>, ApiError> {
    let request = ApiRequest::get("/api/allstatus").query("type", "all");

    let items: Vec<StatusItem> = api.send_json(request).await.map_err(|e| {
        warn!(error = %e, "Failed to fetch status snapshot");
        e
    })?;

    info!(count = items.len(), "Fetched status snapshot");
    Ok(items)
}

/// Latest status snapshot, replaced wholesale on every fetch
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    items: Vec<StatusItem>,
}

impl StatusBoard {
    pub fn new(items: Vec<StatusItem>) -> Self {
        Self { items }
    }

    pub fn replace(&mut self, items: Vec<StatusItem>) {
        self.items = items;
    }

    /// Fetches a fresh snapshot. The current one is kept when the fetch fails.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<BoardStats, ApiError> {
        let items = fetch_all_status(api).await?;
        self.replace(items);
        Ok(self.stats())
    }

    pub fn items(&self) -> &[StatusItem] {
        &self.items
    }

    pub fn stats(&self) -> BoardStats {
        let total = self.items.len();
        let high = self.count(RiskLevel::High);
        let middle = self.count(RiskLevel::Middle);
        BoardStats {
            total,
            high,
            middle,
            safe: total.saturating_sub(high + middle),
        }
    }

    pub fn high_group(&self) -> Vec<&StatusItem> {
        self.group(RiskLevel::High)
    }

    pub fn middle_group(&self) -> Vec<&StatusItem> {
        self.group(RiskLevel::Middle)
    }

    fn group(&self, tier: RiskLevel) -> Vec<&StatusItem> {
        self.items.iter().filter(|item| item.tier == tier).collect()
    }

    fn count(&self, tier: RiskLevel) -> usize {
        self.items.iter().filter(|item| item.tier == tier).count()
    }
}

/// One-line description shared by both risk groups
pub fn summary_line(item: &StatusItem) -> String {
    format!(
        "우울도 : {}  감정점수 : {}점  감정상태 : {}  질병 : {}",
        item.depression_score,
        item.sentiment_percent(),
        item.sentiment_label,
        item.disease
    )
}
