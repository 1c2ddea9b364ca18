//! Running blocking functions as asynchronous stages.

use super::runtime::dispatch_blocking;
use crate::deferred::Deferred;
use crate::engine::panic_message;
use crate::errors::FlowError;
use crate::stages::{Next, Stage};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

type BlockingFn = dyn Fn(Value) -> Result<Value, FlowError> + Send + Sync;

/// A stage that runs a blocking function off the engine's thread.
///
/// Each application dispatches `func` to a worker and returns a pending
/// result immediately; the pipeline suspends until the worker finishes.
/// Failures are reported as [`FlowError::Blocking`] with the input.
pub struct BlockingStage {
    name: String,
    func: Arc<BlockingFn>,
}

impl BlockingStage {
    /// Creates a new blocking stage.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, FlowError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl Stage for BlockingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: Value) -> Result<Next, FlowError> {
        let result = Deferred::pending();
        let producer = result.clone();
        let func = self.func.clone();
        let stage = self.name.clone();

        dispatch_blocking(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| func(input.clone())))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    warn!(stage = %stage, panic = %message, "Blocking worker panicked");
                    Err(FlowError::Panicked { stage, message })
                });
            match outcome {
                Ok(value) => producer.resolve_success(value),
                Err(source) => producer.resolve_failure(FlowError::blocking(input, source)),
            };
        })?;

        Ok(Next::Deferred(result))
    }
}

impl std::fmt::Debug for BlockingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingStage")
            .field("name", &self.name)
            .finish()
    }
}

/// Adapts a synchronous function into an asynchronous stage.
pub fn blocking<F>(name: impl Into<String>, func: F) -> Arc<dyn Stage>
where
    F: Fn(Value) -> Result<Value, FlowError> + Send + Sync + 'static,
{
    Arc::new(BlockingStage::new(name, func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn deferred_of(next: Next) -> Deferred {
        match next {
            Next::Deferred(d) => d,
            other => panic!("expected a pending result, got {other:?}"),
        }
    }

    #[test]
    fn test_blocking_returns_result_immediately() {
        let stage = BlockingStage::new("slow", |v| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(json!(v.as_i64().unwrap_or(0) + 1))
        });

        let result = deferred_of(stage.apply(json!(1)).unwrap());
        assert!(!result.is_resolved());
        assert_eq!(result.wait(Some(Duration::from_secs(1))), Ok(json!(2)));
    }

    #[test]
    fn test_blocking_failure_carries_input() {
        let stage = BlockingStage::new("failing", |_| Err(FlowError::stage("disk on fire")));

        let result = deferred_of(stage.apply(json!("payload")).unwrap());
        assert_eq!(
            result.wait(Some(Duration::from_secs(1))),
            Err(FlowError::blocking(json!("payload"), FlowError::stage("disk on fire")))
        );
    }

    #[test]
    fn test_blocking_panic_is_captured() {
        let stage = BlockingStage::new("panicky", |_| panic!("worker exploded"));

        let err = deferred_of(stage.apply(json!(0)).unwrap())
            .wait(Some(Duration::from_secs(1)))
            .unwrap_err();

        match err {
            FlowError::Blocking { source, .. } => assert_eq!(
                *source,
                FlowError::Panicked {
                    stage: "panicky".to_string(),
                    message: "worker exploded".to_string(),
                }
            ),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_inside_runtime() {
        let stage = blocking("echo", Ok);
        let result = deferred_of(stage.apply(json!("hi")).unwrap());

        assert_eq!(result.outcome().await, Ok(json!("hi")));
    }
}
