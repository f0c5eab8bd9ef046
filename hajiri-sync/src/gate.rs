//! Admission-control gate for outbound requests.
//!
//! Caps how many requests may be in flight at once, with a reduced ceiling
//! in lite (low-bandwidth) mode. Admission is strictly FIFO: a unit starts
//! as soon as the active count drops below the ceiling, and completion of
//! any unit (success or failure) admits the next queued one. The gate is
//! content-agnostic: any outbound caller may route through it, not just
//! the sync engine.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// Point-in-time snapshot of the gate, reported to the UI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub queue_length: usize,
    pub active_requests: usize,
    pub max_concurrent_requests: usize,
    pub is_lite_mode_enabled: bool,
}

struct GateState {
    active: usize,
    lite: bool,
    normal_limit: usize,
    lite_limit: usize,
    /// FIFO queue of admission waiters. `true` = admitted (active count
    /// already incremented on their behalf), `false` = gate cleared.
    waiters: VecDeque<oneshot::Sender<bool>>,
}

impl GateState {
    fn limit(&self) -> usize {
        if self.lite {
            self.lite_limit
        } else {
            self.normal_limit
        }
    }

    /// Admits queued waiters while capacity allows. Dropped waiters
    /// (cancelled callers) are skipped without consuming capacity.
    fn admit_waiters(&mut self) {
        while self.active < self.limit() {
            match self.waiters.pop_front() {
                Some(waiter) => {
                    if waiter.send(true).is_ok() {
                        self.active += 1;
                    }
                }
                None => break,
            }
        }
    }
}

/// FIFO concurrency limiter for outbound requests.
pub struct RequestGate {
    state: Mutex<GateState>,
}

/// Admission token. Dropping it releases the slot and admits the next waiter.
struct GatePermit<'a> {
    gate: &'a RequestGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.state.lock().unwrap();
        state.active -= 1;
        state.admit_waiters();
    }
}

impl RequestGate {
    pub fn new(max_concurrent: usize, lite_max_concurrent: usize) -> Self {
        Self {
            state: Mutex::new(GateState {
                active: 0,
                lite: false,
                normal_limit: max_concurrent,
                lite_limit: lite_max_concurrent,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Defers `execute` until fewer than the ceiling are in flight, then
    /// runs it and resolves exactly as it would. Returns
    /// [`SyncError::GateCleared`] if [`clear`](Self::clear) rejects the
    /// unit before it is admitted.
    pub async fn enqueue<F, Fut, T>(&self, execute: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let _permit = self.acquire().await?;
        execute().await
    }

    async fn acquire(&self) -> Result<GatePermit<'_>, SyncError> {
        let rx = {
            let mut state = self.state.lock().unwrap();
            if state.active < state.limit() {
                state.active += 1;
                return Ok(GatePermit { gate: self });
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        match rx.await {
            Ok(true) => Ok(GatePermit { gate: self }),
            // false = cleared; a dropped sender means the same
            _ => Err(SyncError::GateCleared),
        }
    }

    /// Toggles lite mode. Affects only not-yet-admitted work; raising the
    /// ceiling admits eligible waiters immediately.
    pub fn set_lite_mode(&self, lite: bool) {
        let mut state = self.state.lock().unwrap();
        if state.lite != lite {
            debug!(lite, "request gate mode changed");
        }
        state.lite = lite;
        state.admit_waiters();
    }

    /// Rejects all not-yet-admitted units with a distinguishable error.
    /// In-flight work is untouched.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        let rejected = state.waiters.len();
        for waiter in state.waiters.drain(..) {
            let _ = waiter.send(false);
        }
        if rejected > 0 {
            debug!(rejected, "request gate cleared queued work");
        }
    }

    pub fn status(&self) -> GateStatus {
        let state = self.state.lock().unwrap();
        GateStatus {
            queue_length: state.waiters.len(),
            active_requests: state.active,
            max_concurrent_requests: state.limit(),
            is_lite_mode_enabled: state.lite,
        }
    }
}
