pub mod aggregator;
pub mod notifier;

pub use aggregator::{acknowledge, merge_alerts, AlertCenter, MAX_ALERTS};
pub use notifier::{
    AlertPresenter, AlwaysVisible, NotificationGate, NotificationPermission, NotifyOutcome,
    SystemNotifier, TerminalPresenter, Visibility,
};
