//! # Admin Module
//!
//! Data behind the monitoring console:
//! - Status board with risk-tier counters and groups
//! - Per-person detail and nearest emergency facilities
//! - User search and periodic board refresh

pub mod handlers;
pub mod models;
pub mod services;

#[cfg(test)]
mod tests;

pub use handlers::StatusBoard;
pub use models::{BoardStats, StatusItem};
pub use services::StatusPoller;
