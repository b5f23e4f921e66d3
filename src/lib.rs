//! Client library for the 은빛지기 elder-care monitoring platform.
//!
//! Talks to the platform API with automatic access-token refresh, keeps a
//! live alert feed over a self-healing WebSocket, and exposes the data
//! behind the admin console and the counselling chat.

pub mod admin;
pub mod alerts;
pub mod auth;
pub mod chat;
pub mod common;
pub mod services;
pub mod socket;

#[cfg(test)]
pub(crate) mod test_support;

pub use common::{ApiError, ClientConfig, ClientContext};
