//! Message queues that stages read from.
//!
//! [`Channel`] is the contract the composition helpers rely on;
//! [`MessageQueue`] is the in-process implementation.

mod message_queue;

pub use message_queue::MessageQueue;

use crate::deferred::Deferred;
use crate::errors::FlowError;
use serde_json::Value;
use std::time::Duration;

/// A FIFO message source safe to use from any thread.
#[cfg_attr(test, mockall::automock)]
pub trait Channel: Send + Sync {
    /// Makes `value` available to a future receive.
    fn enqueue(&self, value: Value) -> Result<(), FlowError>;

    /// Takes a buffered value without waiting.
    fn dequeue(&self) -> Option<Value>;

    /// Returns true once no further values will ever be received.
    fn drained(&self) -> bool;

    /// Receives the next value asynchronously.
    ///
    /// The result fails with [`FlowError::Timeout`] if `timeout` elapses
    /// first; `None` waits indefinitely. Each value is delivered to exactly
    /// one poll.
    fn poll(&self, timeout: Option<Duration>) -> Deferred;
}
