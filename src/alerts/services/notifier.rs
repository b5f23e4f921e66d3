// Attention side effects for high-risk alerts
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::alerts::models::AlertItem;

/// Shows the immediate attention modal
pub trait AlertPresenter: Send + Sync {
    fn show_modal(&self, alert: &AlertItem);
}

/// Whether the monitoring view is currently in front of the user
pub trait Visibility: Send + Sync {
    fn is_visible(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

/// Platform notification facility
#[async_trait]
pub trait SystemNotifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Asks the user; may come back as `Default` if they dismissed the prompt
    async fn request_permission(&self) -> NotificationPermission;

    fn notify(&self, title: &str, body: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Shown,
    /// Permission was denied earlier; nothing was attempted
    Suppressed,
    /// Asked for permission and did not get it
    Refused,
}

pub const NOTIFICATION_TITLE: &str = "고위험 감지";

/// Permission-gated system notifications.
///
/// `Granted` notifies straight away, `Default` asks first, `Denied` is
/// final and never asks again.
pub struct NotificationGate {
    notifier: Arc<dyn SystemNotifier>,
    permission: Mutex<NotificationPermission>,
}

impl NotificationGate {
    pub fn new(notifier: Arc<dyn SystemNotifier>) -> Self {
        let permission = notifier.permission();
        Self {
            notifier,
            permission: Mutex::new(permission),
        }
    }

    pub fn permission(&self) -> NotificationPermission {
        *self
            .permission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn notify(&self, alert: &AlertItem) -> NotifyOutcome {
        let permission = match self.permission() {
            NotificationPermission::Default => {
                debug!("Requesting notification permission");
                let answer = self.notifier.request_permission().await;
                *self
                    .permission
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = answer;
                if answer != NotificationPermission::Granted {
                    info!(?answer, "Notification permission not granted");
                    return NotifyOutcome::Refused;
                }
                answer
            }
            other => other,
        };

        match permission {
            NotificationPermission::Granted => {
                self.notifier.notify(NOTIFICATION_TITLE, &alert.headline());
                NotifyOutcome::Shown
            }
            _ => NotifyOutcome::Suppressed,
        }
    }
}

/// Presenter for terminal hosts: prints a banner
#[derive(Debug, Default)]
pub struct TerminalPresenter;

impl AlertPresenter for TerminalPresenter {
    fn show_modal(&self, alert: &AlertItem) {
        println!(
            "\n!!! [{}] {} ({})\n    감정상태: {}  질병: {}  시각: {}\n",
            NOTIFICATION_TITLE,
            alert.headline(),
            alert.user_id,
            alert.sentiment_label,
            alert.disease,
            alert.occurred_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
}

/// A terminal is always in front of whoever started it
#[derive(Debug, Default)]
pub struct AlwaysVisible;

impl Visibility for AlwaysVisible {
    fn is_visible(&self) -> bool {
        true
    }
}
