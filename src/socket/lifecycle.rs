// Pairs socket setup with teardown across remounts
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use super::client::SocketClient;

pub const DEFAULT_RELEASE_GRACE: Duration = Duration::from_millis(50);

/// Proof of one `setup` call, handed back to `release`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountTicket(u64);

/// Guards a shared [`SocketClient`] against hosts that run setup and
/// teardown more than once for a single logical mount.
///
/// Every `setup` bumps a generation counter. A `release` only tears the
/// connection down if no newer `setup` happened within the grace period,
/// so a setup/release/setup burst keeps the original connection alive.
#[derive(Clone)]
pub struct SocketMount {
    client: Arc<SocketClient>,
    generation: Arc<AtomicU64>,
    grace: Duration,
}

impl SocketMount {
    pub fn new(client: Arc<SocketClient>) -> Self {
        Self::with_grace(client, DEFAULT_RELEASE_GRACE)
    }

    pub fn with_grace(client: Arc<SocketClient>, grace: Duration) -> Self {
        Self {
            client,
            generation: Arc::new(AtomicU64::new(0)),
            grace,
        }
    }

    pub fn client(&self) -> &Arc<SocketClient> {
        &self.client
    }

    /// Connects if nothing is live yet; always returns a fresh ticket
    pub fn setup(&self) -> MountTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.client.connect();
        MountTicket(generation)
    }

    /// Schedules teardown for `ticket`. Stale tickets are ignored.
    pub fn release(&self, ticket: MountTicket) {
        if !self.is_current(ticket) {
            debug!(generation = ticket.0, "Stale mount released; ignoring");
            return;
        }

        let client = self.client.clone();
        let generation = self.generation.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            sleep(grace).await;
            if generation.load(Ordering::SeqCst) == ticket.0 {
                client.teardown();
            } else {
                debug!(generation = ticket.0, "Remounted during grace period; keeping socket");
            }
        });
    }

    pub fn is_current(&self, ticket: MountTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}
