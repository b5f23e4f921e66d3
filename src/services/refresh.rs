// src/services/refresh.rs
//! Single-flight coordination for access token refresh
//!
//! Any number of requests may hit a 401 at the same time. The first one
//! becomes the leader and performs the refresh; the rest park on a oneshot
//! channel until the leader finishes and are told whether it succeeded.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::common::error::ApiError;

#[derive(Default)]
struct GateState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<bool>>,
}

#[derive(Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

enum Turn {
    Lead,
    Wait(oneshot::Receiver<bool>),
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Runs `refresh` unless one is already in flight, in which case this
    /// call waits for that one's outcome instead.
    pub async fn run<F, Fut>(&self, refresh: F) -> Result<(), ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let turn = {
            let mut state = self.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Turn::Wait(rx)
            } else {
                state.refreshing = true;
                Turn::Lead
            }
        };

        match turn {
            Turn::Wait(rx) => {
                debug!("Refresh already in flight; waiting for it");
                match rx.await {
                    Ok(true) => Ok(()),
                    _ => Err(ApiError::RefreshFailed(
                        "concurrent refresh did not succeed".to_string(),
                    )),
                }
            }
            Turn::Lead => {
                let mut guard = LeaderGuard {
                    gate: self,
                    released: false,
                };
                let result = refresh().await;
                guard.release(result.is_ok());
                result
            }
        }
    }

    // Clears the flag and wakes every parked request with the outcome
    fn release(&self, succeeded: bool) {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        debug!(waiters = waiters.len(), succeeded, "Releasing queued requests");
        for waiter in waiters {
            let _ = waiter.send(succeeded);
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// Releases the gate if the leader's future is dropped mid-refresh
struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    released: bool,
}

impl LeaderGuard<'_> {
    fn release(&mut self, succeeded: bool) {
        if !self.released {
            self.released = true;
            self.gate.release(succeeded);
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!("Refresh leader cancelled; failing queued requests");
            self.release(false);
        }
    }
}
