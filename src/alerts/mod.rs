//! Live risk alerts
//!
//! Socket payloads are normalized into [`models::AlertItem`]s, merged into
//! the bounded [`services::AlertCenter`] list, and high-risk arrivals raise
//! a modal plus, when the view is hidden, a system notification.

pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod services;


pub use handlers::AlertMonitor;
pub use models::{AlertItem, RiskLevel};
pub use services::AlertCenter;
