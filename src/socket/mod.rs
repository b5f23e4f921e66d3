//! Resilient WebSocket client
//!
//! [`SocketClient`] keeps one connection alive with exponential backoff and
//! a heartbeat, reporting events to a [`SocketHandler`]. [`SocketMount`]
//! pairs setup with teardown for hosts that mount more than once.

pub mod backoff;
pub mod client;
pub mod lifecycle;
pub mod transport;

#[cfg(test)]
mod tests;

pub use client::{SocketClient, SocketHandler, SocketOptions, SocketSender, SocketState};
pub use lifecycle::{MountTicket, SocketMount};
pub use transport::{Connection, Transport, TungsteniteTransport};
