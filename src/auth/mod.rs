//! # Auth Module
//!
//! This module handles the client side of the session lifecycle:
//! - Token store with durable and session-only persistence
//! - Access token expiry introspection
//! - Login, admin login, registration, logout and session restore

pub mod handlers;
pub mod models;
pub mod token_store;
pub mod validators;


pub use models::{SessionState, TokenPair};
pub use token_store::{is_expired, is_expired_at, TokenStore};
