//! Test assertions for pipeline results.

use std::time::Duration;

use serde_json::Value;

use crate::deferred::{wait_for_result, Deferred};
use crate::errors::FlowError;

/// How long assertions wait for a pending result.
pub const ASSERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Asserts that the result succeeds with `expected`.
pub fn assert_succeeded_with(result: &Deferred, expected: &Value) {
    match wait_for_result(result, Some(ASSERT_TIMEOUT)) {
        Ok(actual) => assert_eq!(
            &actual, expected,
            "Expected success with {expected:?}, got {actual:?}"
        ),
        Err(e) => panic!("Expected success with {expected:?}, got failure: {e}"),
    }
}

/// Asserts that the result fails, returning the error.
pub fn assert_failed(result: &Deferred) -> FlowError {
    match wait_for_result(result, Some(ASSERT_TIMEOUT)) {
        Ok(value) => panic!("Expected failure, got success: {value:?}"),
        Err(FlowError::Timeout(after)) if !result.is_resolved() => {
            panic!("Expected failure, but result still pending after {after:?}")
        }
        Err(e) => e,
    }
}

/// Asserts that the result fails with `expected`.
pub fn assert_failed_with(result: &Deferred, expected: &FlowError) {
    let actual = assert_failed(result);
    assert_eq!(
        &actual, expected,
        "Expected failure {expected:?}, got {actual:?}"
    );
}

/// Asserts that the result has not resolved yet.
pub fn assert_pending(result: &Deferred) {
    assert!(
        result.peek().is_none(),
        "Expected pending result, got {:?}",
        result.peek()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assert_succeeded_with() {
        assert_succeeded_with(&Deferred::success(1), &json!(1));
    }

    #[test]
    #[should_panic(expected = "Expected success")]
    fn test_assert_succeeded_with_panics_on_failure() {
        assert_succeeded_with(&Deferred::failure(FlowError::Drained), &json!(1));
    }

    #[test]
    fn test_assert_failed_with() {
        assert_failed_with(&Deferred::failure(FlowError::Closed), &FlowError::Closed);
    }

    #[test]
    #[should_panic(expected = "Expected failure")]
    fn test_assert_failed_panics_on_success() {
        assert_failed(&Deferred::success(json!(null)));
    }

    #[test]
    fn test_assert_pending() {
        assert_pending(&Deferred::pending());
    }
}
