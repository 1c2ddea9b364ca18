//! Observing how many times a result resolves.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::deferred::{Deferred, Outcome};

/// Counts terminal callbacks delivered by a [`Deferred`].
///
/// Subscribes both outcome callbacks; a correctly resolved result fires
/// exactly one of them exactly once.
#[derive(Debug, Clone, Default)]
pub struct OutcomeProbe {
    successes: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<Outcome>>>,
}

impl OutcomeProbe {
    /// Attaches a probe to `result`.
    #[must_use]
    pub fn attach(result: &Deferred) -> Self {
        let probe = Self::default();
        let on_success = probe.clone();
        let on_failure = probe.clone();
        result.subscribe(
            move |value| {
                on_success.successes.fetch_add(1, Ordering::SeqCst);
                *on_success.last.lock() = Some(Ok(value));
            },
            move |error| {
                on_failure.failures.fetch_add(1, Ordering::SeqCst);
                *on_failure.last.lock() = Some(Err(error));
            },
        );
        probe
    }

    /// Number of success callbacks.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    /// Number of failure callbacks.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Total terminal callbacks.
    #[must_use]
    pub fn total(&self) -> usize {
        self.successes() + self.failures()
    }

    /// The last outcome delivered.
    #[must_use]
    pub fn last(&self) -> Option<Outcome> {
        self.last.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FlowError;
    use serde_json::json;

    #[test]
    fn test_probe_counts_single_success() {
        let result = Deferred::pending();
        let probe = OutcomeProbe::attach(&result);
        assert_eq!(probe.total(), 0);

        result.resolve_success(json!(1));
        result.resolve_failure(FlowError::Drained);

        assert_eq!(probe.successes(), 1);
        assert_eq!(probe.failures(), 0);
        assert_eq!(probe.last(), Some(Ok(json!(1))));
    }

    #[test]
    fn test_probe_on_failed_result() {
        let probe = OutcomeProbe::attach(&Deferred::failure(FlowError::Closed));
        assert_eq!(probe.failures(), 1);
        assert_eq!(probe.total(), 1);
    }
}
