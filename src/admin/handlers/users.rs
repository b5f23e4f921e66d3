// src/admin/handlers/users.rs

use tracing::{debug, info, warn};

use crate::admin::models::{Nearby, Row, UserDetail};
use crate::common::error::ApiError;
use crate::common::helpers::calc_age;
use crate::services::api_client::{ApiClient, ApiRequest};

/// GET /api/userdetail?_id= - Full profile of one person
pub async fn fetch_user_detail(api: &ApiClient, user_id: &str) -> Result<UserDetail, ApiError> {
    let request = ApiRequest::get("/api/userdetail").query("_id", user_id);

    let detail: UserDetail = api.send_json(request).await.map_err(|e| {
        warn!(user_id = %user_id, error = %e, "Failed to fetch user detail");
        e
    })?;

    info!(user_id = %user_id, risk = %detail.risk, "Fetched user detail");
    Ok(detail)
}

/// GET /api/nearby?address= - Closest hospital and fire station.
/// Blank addresses are not sent.
pub async fn fetch_nearby(api: &ApiClient, address: &str) -> Result<Option<Nearby>, ApiError> {
    let address = address.trim();
    if address.is_empty() {
        debug!("No address on file; skipping nearby lookup");
        return Ok(None);
    }

    let request = ApiRequest::get("/api/nearby").query("address", address);
    let nearby: Nearby = api.send_json(request).await?;

    debug!(
        hospital_km = nearby.hospital.1,
        firehouse_km = nearby.firehouse.1,
        "Fetched nearby facilities"
    );
    Ok(Some(nearby))
}

impl From<&UserDetail> for Row {
    fn from(detail: &UserDetail) -> Self {
        Self {
            user_id: detail.user_id.clone(),
            name: detail.name.clone(),
            age: detail.birth.as_deref().and_then(calc_age),
            risk: detail.risk,
        }
    }
}

/// Case-insensitive search over name, id and age. A blank query keeps every row.
pub fn filter_users<'a>(rows: &'a [Row], query: &str) -> Vec<&'a Row> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.iter().collect();
    }

    rows.iter()
        .filter(|row| {
            let age = row.age.map(|a| a.to_string()).unwrap_or_default();
            format!("{} {} {}", row.name, row.user_id, age)
                .to_lowercase()
                .contains(&needle)
        })
        .collect()
}
