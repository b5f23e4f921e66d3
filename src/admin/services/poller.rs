// Periodic status board refresh

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::admin::handlers::StatusBoard;
use crate::services::api_client::ApiClient;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Refreshes a shared [`StatusBoard`] on a fixed period until stopped.
/// Dropping the poller stops it.
pub struct StatusPoller {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Starts polling. The first refresh happens one period from now.
    pub fn start(api: ApiClient, board: Arc<RwLock<StatusBoard>>, period: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poll(api, board, period, shutdown_rx));
        Self {
            shutdown,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancels the timer and any refresh in flight
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Status poller ended abnormally");
            }
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll(
    api: ApiClient,
    board: Arc<RwLock<StatusBoard>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "Status poller started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        // Fetch outside the lock so readers never wait on the network
        let fetched = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            result = crate::admin::handlers::fetch_all_status(&api) => result,
        };

        match fetched {
            Ok(items) => {
                let mut board = board.write().await;
                board.replace(items);
                let stats = board.stats();
                debug!(
                    total = stats.total,
                    high = stats.high,
                    middle = stats.middle,
                    "Status board refreshed"
                );
            }
            Err(e) => warn!(error = %e, "Status refresh failed; keeping previous snapshot"),
        }
    }

    debug!("Status poller stopped");
}
