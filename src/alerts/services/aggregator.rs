use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::alerts::models::AlertItem;
use crate::common::error::ApiError;
use crate::services::api_client::{ApiClient, ApiRequest};

/// Most recent alerts kept in memory
pub const MAX_ALERTS: usize = 300;

/// Merges `incoming` into `current`.
///
/// Items are keyed by id and incoming wins, except that an alert already
/// marked read stays read. The result is sorted newest first (id breaks
/// ties) and cut to [`MAX_ALERTS`]. Merging the same batch twice gives the
/// same list as merging it once.
pub fn merge_alerts(current: &[AlertItem], incoming: Vec<AlertItem>) -> Vec<AlertItem> {
    let mut by_id: HashMap<String, AlertItem> = current
        .iter()
        .map(|alert| (alert.id.clone(), alert.clone()))
        .collect();

    for mut alert in incoming {
        if let Some(existing) = by_id.get(&alert.id) {
            alert.read |= existing.read;
        }
        by_id.insert(alert.id.clone(), alert);
    }

    let mut merged: Vec<AlertItem> = by_id.into_values().collect();
    merged.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(MAX_ALERTS);
    merged
}

/// Authoritative client-side alert list with read-state reconciliation
pub struct AlertCenter {
    api: ApiClient,
    alerts: Mutex<Vec<AlertItem>>,
}

impl AlertCenter {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            alerts: Mutex::new(Vec::new()),
        }
    }

    /// Merges a batch and returns the high-risk alerts from it that are
    /// still unread afterwards, in list order. An alert already held as
    /// high risk is not returned again when it is replayed.
    pub fn apply(&self, incoming: Vec<AlertItem>) -> Vec<AlertItem> {
        if incoming.is_empty() {
            return Vec::new();
        }
        let incoming_ids: Vec<String> = incoming.iter().map(|a| a.id.clone()).collect();
        let received = incoming.len();

        let mut alerts = self.lock();
        let known_high: HashSet<String> = alerts
            .iter()
            .filter(|a| a.level.is_high())
            .map(|a| a.id.clone())
            .collect();
        *alerts = merge_alerts(&alerts, incoming);

        let urgent: Vec<AlertItem> = alerts
            .iter()
            .filter(|a| a.level.is_high() && !a.read && !known_high.contains(&a.id))
            .filter(|a| incoming_ids.contains(&a.id))
            .cloned()
            .collect();
        debug!(
            received,
            total = alerts.len(),
            urgent = urgent.len(),
            "Alerts merged"
        );
        urgent
    }

    pub fn snapshot(&self) -> Vec<AlertItem> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<AlertItem> {
        self.lock().iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.lock().iter().filter(|a| !a.read).count()
    }

    /// Marks one alert read locally, then acknowledges it with the server.
    ///
    /// Returns `Ok(false)` without any request when the id is unknown or
    /// already read. Alerts with a client-derived id are only marked
    /// locally. A failed acknowledgement rolls the local flag back.
    pub async fn mark_read(&self, id: &str) -> Result<bool, ApiError> {
        let Some(synthetic) = self.set_read(id, true) else {
            return Ok(false);
        };
        if synthetic {
            debug!(alert_id = %id, "Alert has no server id; marked read locally");
            return Ok(true);
        }

        match acknowledge(&self.api, id).await {
            Ok(()) => {
                info!(alert_id = %id, "Alert marked read");
                Ok(true)
            }
            Err(e) => {
                warn!(alert_id = %id, error = %e, "Read acknowledgement failed; rolling back");
                self.set_read(id, false);
                Err(e)
            }
        }
    }

    /// Marks every unread alert read. Acknowledgements go out concurrently;
    /// the ones that fail are rolled back and the first error is returned.
    pub async fn mark_all_read(&self) -> Result<usize, ApiError> {
        let (local, remote): (Vec<AlertItem>, Vec<AlertItem>) = {
            let mut alerts = self.lock();
            alerts
                .iter_mut()
                .filter(|a| !a.read)
                .map(|a| {
                    a.read = true;
                    a.clone()
                })
                .partition(|a| a.synthetic)
        };
        if local.is_empty() && remote.is_empty() {
            return Ok(0);
        }

        let results = join_all(remote.iter().map(|a| acknowledge(&self.api, &a.id))).await;

        let mut first_error = None;
        let mut acknowledged = 0;
        for (alert, result) in remote.iter().zip(results) {
            match result {
                Ok(()) => acknowledged += 1,
                Err(e) => {
                    self.set_read(&alert.id, false);
                    first_error.get_or_insert(e);
                }
            }
        }

        info!(
            acknowledged,
            requested = remote.len(),
            local = local.len(),
            "Bulk read acknowledgement finished"
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(acknowledged + local.len()),
        }
    }

    // Some(synthetic) when the flag actually changed
    fn set_read(&self, id: &str, read: bool) -> Option<bool> {
        let mut alerts = self.lock();
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) if alert.read != read => {
                alert.read = read;
                Some(alert.synthetic)
            }
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AlertItem>> {
        self.alerts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `POST /ws/isread?id=<alert id>`
pub async fn acknowledge(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.send(ApiRequest::post("/ws/isread").query("id", id)).await?;
    Ok(())
}
