// src/services/mod.rs
//
// Shared services used across the domain modules

pub mod api_client;
pub mod monitoring;
pub mod refresh;

// Re-export commonly used types for convenience
pub use api_client::{ApiClient, ApiRequest};
pub use monitoring::{Monitoring, MonitoringConfig};
pub use refresh::RefreshGate;
