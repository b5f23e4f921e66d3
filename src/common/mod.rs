// Common module - shared types and utilities across all modules

pub mod config;
pub mod error;
pub mod helpers;
pub mod state;
pub mod validation;

// Re-export commonly used types for convenience
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, PayloadError, SocketError, TokenError};
pub use helpers::safe_token_log;
pub use state::ClientContext;
pub use validation::{ValidationError, ValidationResult, Validator};
