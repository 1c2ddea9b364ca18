//! Blocking waits and result forwarding.

use super::{Deferred, Outcome};
use crate::errors::FlowError;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Blocks the calling thread until `result` resolves or `timeout` elapses.
///
/// `None` waits indefinitely. A failed result is returned as its error; an
/// elapsed timeout as [`FlowError::Timeout`]. Meant for code outside any
/// pipeline, such as program entry points and tests. Calling it from a
/// thread that must deliver the result deadlocks.
pub fn wait_for_result(result: &Deferred, timeout: Option<Duration>) -> Result<Value, FlowError> {
    if let Some(outcome) = result.peek() {
        return outcome;
    }

    let signal: Arc<(Mutex<Option<Outcome>>, Condvar)> = Arc::new((Mutex::new(None), Condvar::new()));
    let notifier = signal.clone();
    result.on_resolve(move |outcome| {
        let (slot, ready) = &*notifier;
        *slot.lock() = Some(outcome);
        ready.notify_all();
    });

    let (slot, ready) = &*signal;
    let mut guard = slot.lock();
    // A deadline beyond what `Instant` can represent waits indefinitely.
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

    loop {
        if let Some(outcome) = guard.take() {
            return outcome;
        }
        match deadline {
            None => ready.wait(&mut guard),
            Some(deadline) => {
                if ready.wait_until(&mut guard, deadline).timed_out() {
                    return guard
                        .take()
                        .unwrap_or(Err(FlowError::Timeout(timeout.unwrap_or_default())));
                }
            }
        }
    }
}

/// Forwards the eventual outcome of `src` into `dst`.
pub fn siphon_result(src: &Deferred, dst: &Deferred) {
    let on_success = dst.clone();
    let on_failure = dst.clone();
    src.subscribe(
        move |value| {
            on_success.resolve_success(value);
        },
        move |error| {
            on_failure.resolve_failure(error);
        },
    );
}

impl Deferred {
    /// Blocks until resolved; see [`wait_for_result`].
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Value, FlowError> {
        wait_for_result(self, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_wait_returns_resolved_value() {
        assert_eq!(wait_for_result(&Deferred::success(4), None), Ok(json!(4)));
    }

    #[test]
    fn test_wait_returns_failure_payload() {
        let result = Deferred::failure(FlowError::rejected(json!({"why": "bad"})));
        assert_eq!(
            wait_for_result(&result, Some(Duration::from_millis(10))),
            Err(FlowError::Rejected(json!({"why": "bad"})))
        );
    }

    #[test]
    fn test_wait_for_value_from_another_thread() {
        let result = Deferred::pending();
        let producer = result.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.resolve_success(json!("late"));
        });

        assert_eq!(result.wait(None), Ok(json!("late")));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_times_out() {
        let result = Deferred::pending();
        let err = wait_for_result(&result, Some(Duration::from_millis(20))).unwrap_err();

        assert_eq!(err, FlowError::Timeout(Duration::from_millis(20)));
        assert!(!result.is_resolved());
    }

    #[test]
    fn test_wait_with_unrepresentable_timeout_waits_for_value() {
        let result = Deferred::pending();
        let producer = result.clone();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.resolve_success(json!("eventually"));
        });

        assert_eq!(wait_for_result(&result, Some(Duration::MAX)), Ok(json!("eventually")));
    }

    #[test]
    fn test_siphon_forwards_success_once() {
        let src = Deferred::pending();
        let dst = Deferred::pending();
        let deliveries = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            src.subscribe(|_| {}, |_| {});
        }
        siphon_result(&src, &dst);
        let counter = deliveries.clone();
        dst.on_resolve(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        src.resolve_success(json!("v"));

        assert_eq!(dst.peek(), Some(Ok(json!("v"))));
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_siphon_forwards_failure() {
        let src = Deferred::failure(FlowError::Drained);
        let dst = Deferred::pending();

        siphon_result(&src, &dst);

        assert_eq!(dst.peek(), Some(Err(FlowError::Drained)));
    }
}
