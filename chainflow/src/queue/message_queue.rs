//! In-process message queue.

use super::Channel;
use crate::deferred::Deferred;
use crate::errors::FlowError;
use crate::helpers::runtime::schedule_after;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Default)]
struct QueueState {
    /// Values nobody has asked for yet.
    buffer: VecDeque<Value>,
    /// Polls waiting for a value, oldest first.
    waiters: VecDeque<Deferred>,
    /// No further values will be accepted.
    closed: bool,
}

/// An unbounded FIFO queue whose receives are [`Deferred`] results.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct MessageQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MessageQueue {
    /// Creates an empty open queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the queue.
    ///
    /// Buffered values remain readable. Pending polls fail with
    /// [`FlowError::Drained`].
    pub fn close(&self) {
        let waiters = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            waiter.resolve_failure(FlowError::Drained);
        }
    }

    /// Returns true if the queue no longer accepts values.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of buffered values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Returns true if no values are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of polls still waiting.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state
            .lock()
            .waiters
            .iter()
            .filter(|w| !w.is_resolved())
            .count()
    }
}

impl Channel for MessageQueue {
    fn enqueue(&self, value: Value) -> Result<(), FlowError> {
        loop {
            let waiter = {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(FlowError::Closed);
                }
                match state.waiters.pop_front() {
                    Some(waiter) => waiter,
                    None => {
                        state.buffer.push_back(value);
                        return Ok(());
                    }
                }
            };

            // Resolve outside the lock: the waiter may resume a pipeline
            // that touches this queue again.
            if waiter.resolve_success(value.clone()) {
                return Ok(());
            }
            debug!("Skipping poll that already timed out");
        }
    }

    fn dequeue(&self) -> Option<Value> {
        self.state.lock().buffer.pop_front()
    }

    fn drained(&self) -> bool {
        let state = self.state.lock();
        state.closed && state.buffer.is_empty()
    }

    fn poll(&self, timeout: Option<Duration>) -> Deferred {
        let waiter = {
            let mut state = self.state.lock();
            if let Some(value) = state.buffer.pop_front() {
                return Deferred::success(value);
            }
            if state.closed {
                return Deferred::failure(FlowError::Drained);
            }
            state.waiters.retain(|w| !w.is_resolved());
            let waiter = Deferred::pending();
            state.waiters.push_back(waiter.clone());
            waiter
        };

        if let Some(after) = timeout {
            let expiring = waiter.clone();
            let scheduled = schedule_after(after, move || {
                if expiring.resolve_failure(FlowError::Timeout(after)) {
                    debug!(timeout_ms = after.as_millis() as u64, "Queue poll timed out");
                }
            });
            if let Err(e) = scheduled {
                warn!(error = %e, "Could not schedule poll timeout");
                waiter.resolve_failure(e);
            }
        }

        waiter
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MessageQueue")
            .field("buffered", &state.buffer.len())
            .field("waiters", &state.waiters.len())
            .field("closed", &state.closed)
            .finish()
    }
}
