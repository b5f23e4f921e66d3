use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::alerts::models::AlertItem;
use crate::alerts::normalizer::normalize;
use crate::alerts::services::{
    AlertCenter, AlertPresenter, AlwaysVisible, NotificationGate, Visibility,
};
use crate::common::error::SocketError;
use crate::socket::{SocketHandler, SocketSender};

/// Asks the server to replay alerts missed while disconnected
pub const CALL_NOT_READ: &str = "call_not_read";

/// Socket handler feeding live alerts into an [`AlertCenter`]
pub struct AlertMonitor {
    center: Arc<AlertCenter>,
    presenter: Arc<dyn AlertPresenter>,
    visibility: Arc<dyn Visibility>,
    notifications: Option<NotificationGate>,
}

impl AlertMonitor {
    pub fn new(center: Arc<AlertCenter>, presenter: Arc<dyn AlertPresenter>) -> Self {
        Self {
            center,
            presenter,
            visibility: Arc::new(AlwaysVisible),
            notifications: None,
        }
    }

    /// System notifications for high-risk alerts while the view is hidden
    pub fn with_notifications(
        mut self,
        visibility: Arc<dyn Visibility>,
        gate: NotificationGate,
    ) -> Self {
        self.visibility = visibility;
        self.notifications = Some(gate);
        self
    }

    pub fn center(&self) -> &Arc<AlertCenter> {
        &self.center
    }

    /// Merges a decoded batch and runs the high-risk side effects
    pub async fn ingest(&self, alerts: Vec<AlertItem>) {
        for alert in self.center.apply(alerts) {
            warn!(
                alert_id = %alert.id,
                user_id = %alert.user_id,
                depression_score = alert.depression_score,
                "High risk alert"
            );
            self.presenter.show_modal(&alert);

            if let Some(gate) = &self.notifications {
                if !self.visibility.is_visible() {
                    let outcome = gate.notify(&alert).await;
                    debug!(alert_id = %alert.id, ?outcome, "System notification");
                }
            }
        }
    }
}

#[async_trait]
impl SocketHandler for AlertMonitor {
    async fn on_open(&self, sender: SocketSender) {
        if let Err(e) = sender.send(CALL_NOT_READ) {
            warn!(error = %e, "Failed to request unread alerts");
        }
    }

    async fn on_message(&self, text: String) {
        match normalize(&text, Utc::now()) {
            Ok(alerts) if alerts.is_empty() => debug!("Socket message carried no alerts"),
            Ok(alerts) => self.ingest(alerts).await,
            Err(e) => warn!(error = %e, "Dropping malformed alert payload"),
        }
    }

    async fn on_error(&self, error: &SocketError) {
        warn!(error = %error, "Alert socket error");
    }

    async fn on_close(&self) {
        info!(unread = self.center.unread_count(), "Alert socket closed");
    }
}
