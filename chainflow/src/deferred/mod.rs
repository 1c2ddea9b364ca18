//! Single-resolution results.
//!
//! A [`Deferred`] is pending, succeeded or failed. It is backed by two
//! write-once broadcast slots, one per outcome, and at most one of them is
//! ever written. Producers resolve it exactly once; any number of consumers
//! may subscribe, peek, block on it or await it.

mod slot;
mod wait;

pub use wait::{siphon_result, wait_for_result};

use crate::errors::FlowError;
use parking_lot::Mutex;
use serde_json::Value;
use slot::Slot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The terminal outcome of a [`Deferred`].
pub type Outcome = Result<Value, FlowError>;

struct Inner {
    /// Set by the first resolution attempt; later attempts are ignored.
    claimed: AtomicBool,
    success: Slot<Value>,
    failure: Slot<FlowError>,
}

/// A single-resolution future with a success and a failure outcome.
///
/// Cloning a `Deferred` yields another handle to the same result.
#[derive(Clone)]
pub struct Deferred {
    inner: Arc<Inner>,
}

impl Deferred {
    /// Creates a pending result.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            inner: Arc::new(Inner {
                claimed: AtomicBool::new(false),
                success: Slot::new(),
                failure: Slot::new(),
            }),
        }
    }

    /// Creates a result that has already succeeded.
    #[must_use]
    pub fn success(value: impl Into<Value>) -> Self {
        Self {
            inner: Arc::new(Inner {
                claimed: AtomicBool::new(true),
                success: Slot::written(value.into()),
                failure: Slot::closed(),
            }),
        }
    }

    /// Creates a result that has already failed.
    #[must_use]
    pub fn failure(error: FlowError) -> Self {
        Self {
            inner: Arc::new(Inner {
                claimed: AtomicBool::new(true),
                success: Slot::closed(),
                failure: Slot::written(error),
            }),
        }
    }

    /// Creates a pre-resolved result from an outcome.
    #[must_use]
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(error),
        }
    }

    fn claim(&self) -> bool {
        let won = self
            .inner
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !won {
            debug!("Ignoring resolution of an already resolved result");
        }
        won
    }

    /// Resolves the result as a success.
    ///
    /// Returns false, without effect, if the result was already resolved.
    pub fn resolve_success(&self, value: impl Into<Value>) -> bool {
        if !self.claim() {
            return false;
        }
        self.inner.success.write(value.into());
        self.inner.failure.close();
        true
    }

    /// Resolves the result as a failure.
    ///
    /// Returns false, without effect, if the result was already resolved.
    pub fn resolve_failure(&self, error: FlowError) -> bool {
        if !self.claim() {
            return false;
        }
        self.inner.failure.write(error);
        self.inner.success.close();
        true
    }

    /// Resolves the result with an outcome.
    pub fn resolve(&self, outcome: Outcome) -> bool {
        match outcome {
            Ok(value) => self.resolve_success(value),
            Err(error) => self.resolve_failure(error),
        }
    }

    /// Registers callbacks for the two outcomes.
    ///
    /// Exactly one of them runs, synchronously if the result is already
    /// resolved, otherwise on the thread that resolves it.
    pub fn subscribe<S, F>(&self, on_success: S, on_failure: F)
    where
        S: FnOnce(Value) + Send + 'static,
        F: FnOnce(FlowError) + Send + 'static,
    {
        self.inner.success.subscribe(Box::new(on_success));
        self.inner.failure.subscribe(Box::new(on_failure));
    }

    /// Registers a single callback receiving whichever outcome occurs.
    pub fn on_resolve<F>(&self, callback: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let callback = Arc::new(Mutex::new(Some(callback)));
        let on_failure = callback.clone();

        self.subscribe(
            move |value| {
                if let Some(callback) = callback.lock().take() {
                    callback(Ok(value));
                }
            },
            move |error| {
                if let Some(callback) = on_failure.lock().take() {
                    callback(Err(error));
                }
            },
        );
    }

    /// Returns the outcome if the result is resolved, without blocking.
    #[must_use]
    pub fn peek(&self) -> Option<Outcome> {
        if let Some(value) = self.inner.success.get() {
            return Some(Ok(value));
        }
        self.inner.failure.get().map(Err)
    }

    /// Returns true once either outcome has been written.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.peek().is_some()
    }

    /// Returns true if both handles refer to the same result.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Waits for the outcome from async code.
    pub async fn outcome(&self) -> Outcome {
        let (tx, rx) = futures::channel::oneshot::channel();
        self.on_resolve(move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.unwrap_or(Err(FlowError::Abandoned))
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::pending()
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("Deferred");
        match self.peek() {
            None => out.field("state", &"pending"),
            Some(Ok(value)) => out.field("success", &value),
            Some(Err(error)) => out.field("failure", &error),
        };
        out.finish()
    }
}
