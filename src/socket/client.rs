//! Self-healing WebSocket client
//!
//! One driver task owns the connection and walks
//! `Idle → Connecting → Open → Closed → Connecting → …` until teardown.
//! Reconnects back off exponentially; the heartbeat only runs while open.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::backoff::{Backoff, DEFAULT_BASE, DEFAULT_CAP};
use super::transport::{Connection, Transport};
use crate::common::config::DEFAULT_HEARTBEAT_SECS;
use crate::common::error::SocketError;

pub const HEARTBEAT_PAYLOAD: &str = r#"{"kind":"ping"}"#;

/// Callbacks the owner of a [`SocketClient`] implements
#[async_trait]
pub trait SocketHandler: Send + Sync + 'static {
    /// The connection is open; `sender` stays valid until it closes
    async fn on_open(&self, sender: SocketSender) {
        let _ = sender;
    }

    async fn on_message(&self, text: String);

    /// Errors never close the connection by themselves
    async fn on_error(&self, error: &SocketError) {
        let _ = error;
    }

    async fn on_close(&self) {}
}

/// Queues text frames onto the live connection
#[derive(Debug, Clone)]
pub struct SocketSender {
    tx: mpsc::UnboundedSender<String>,
}

impl SocketSender {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    pub fn send(&self, text: impl Into<String>) -> Result<(), SocketError> {
        self.tx
            .send(text.into())
            .map_err(|_| SocketError::Send("connection closed".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Idle,
    Connecting,
    Open,
    /// Closed and waiting out the backoff delay
    Closed,
    /// Torn down; terminal until the next `connect`
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub url: String,
    pub heartbeat_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl SocketOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            backoff_base: DEFAULT_BASE,
            backoff_cap: DEFAULT_CAP,
        }
    }

    pub fn heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

struct Driver {
    shutdown: watch::Sender<bool>,
    // Cuts a pending backoff delay short
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

/// Owns at most one logical connection and keeps it alive
pub struct SocketClient {
    options: Arc<SocketOptions>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn SocketHandler>,
    state: Arc<watch::Sender<SocketState>>,
    driver: Mutex<Option<Driver>>,
}

enum SessionEnd {
    Closed,
    Shutdown,
}

impl SocketClient {
    pub fn new(
        options: SocketOptions,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn SocketHandler>,
    ) -> Self {
        let (state, _) = watch::channel(SocketState::Idle);
        Self {
            options: Arc::new(options),
            transport,
            handler,
            state: Arc::new(state),
            driver: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SocketState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SocketState> {
        self.state.subscribe()
    }

    /// Starts the driver unless one is already running.
    ///
    /// While connecting or open this is a no-op. While closed and waiting
    /// out the backoff delay, the delay is skipped and the next attempt
    /// starts right away. Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut driver = self.lock_driver();
        if let Some(active) = driver.as_ref().filter(|d| !d.task.is_finished()) {
            if self.state() == SocketState::Closed {
                debug!(url = %self.options.url, "Reconnect requested during backoff");
                active.wake.notify_one();
            } else {
                debug!(url = %self.options.url, "Socket already active; connect ignored");
            }
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let wake = Arc::new(Notify::new());
        let task = tokio::spawn(run(
            self.options.clone(),
            self.transport.clone(),
            self.handler.clone(),
            self.state.clone(),
            shutdown_rx,
            wake.clone(),
        ));
        *driver = Some(Driver {
            shutdown,
            wake,
            task,
        });
    }

    /// Cancels the heartbeat and any pending reconnect, and closes the live
    /// connection. Safe to call any number of times.
    pub fn teardown(&self) {
        let Some(driver) = self.lock_driver().take() else {
            return;
        };
        info!(url = %self.options.url, "Tearing down socket");
        driver.shutdown.send_replace(true);
    }

    /// [`teardown`](Self::teardown), then waits for the driver to finish
    pub async fn shutdown(&self) {
        let driver = self.lock_driver().take();
        if let Some(driver) = driver {
            driver.shutdown.send_replace(true);
            if let Err(e) = driver.task.await {
                warn!(error = %e, "Socket driver ended abnormally");
            }
        }
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<Driver>> {
        self.driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run(
    options: Arc<SocketOptions>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn SocketHandler>,
    state: Arc<watch::Sender<SocketState>>,
    mut shutdown: watch::Receiver<bool>,
    wake: Arc<Notify>,
) {
    let mut backoff = Backoff::new(options.backoff_base, options.backoff_cap);

    loop {
        state.send_replace(SocketState::Connecting);
        debug!(url = %options.url, attempt = backoff.attempt(), "Connecting socket");

        let connected = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            result = transport.connect(&options.url) => result,
        };

        match connected {
            Ok(connection) => {
                backoff.reset();
                state.send_replace(SocketState::Open);
                info!(url = %options.url, "Socket open");

                let end = session(connection, &options, handler.as_ref(), &mut shutdown).await;
                if let SessionEnd::Shutdown = end {
                    break;
                }
                info!(url = %options.url, "Socket closed");
                handler.on_close().await;
            }
            Err(e) => {
                warn!(url = %options.url, error = %e, "Socket connect failed");
                handler.on_error(&e).await;
            }
        }

        state.send_replace(SocketState::Closed);
        let delay = backoff.next_delay();
        info!(delay_ms = delay.as_millis() as u64, attempt = backoff.attempt(), "Reconnect scheduled");

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = sleep(delay) => {}
            _ = wake.notified() => debug!(url = %options.url, "Backoff skipped"),
        }
    }

    state.send_replace(SocketState::Stopped);
    debug!(url = %options.url, "Socket driver stopped");
}

// Pumps one open connection until it closes or shutdown is requested
async fn session(
    connection: Connection,
    options: &SocketOptions,
    handler: &dyn SocketHandler,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let Connection {
        mut sink,
        mut stream,
    } = connection;

    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();
    handler.on_open(SocketSender::new(tx.clone())).await;

    let period = options.heartbeat_interval;
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if let Err(e) = sink.close().await {
                    debug!(error = %e, "Close handshake failed");
                }
                return SessionEnd::Shutdown;
            }
            event = stream.next() => match event {
                Some(Ok(text)) => handler.on_message(text).await,
                Some(Err(e)) => {
                    warn!(error = %e, "Socket error");
                    handler.on_error(&e).await;
                }
                None => return SessionEnd::Closed,
            },
            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(text).await {
                    warn!(error = %e, "Failed to send socket frame");
                    handler.on_error(&e).await;
                }
            }
            _ = heartbeat.tick() => {
                debug!("Sending heartbeat");
                if let Err(e) = sink.send(HEARTBEAT_PAYLOAD.to_string()).await {
                    handler.on_error(&e).await;
                }
            }
        }
    }
}
