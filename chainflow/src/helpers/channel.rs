//! Reading from channels inside pipelines.

use crate::errors::FlowError;
use crate::pipeline::{CallScope, Pipeline};
use crate::queue::Channel;
use crate::stages::{FnStage, Next, Stage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Receives the next value from `channel`.
///
/// A buffered value is returned directly. Otherwise the result of a
/// timed poll is returned; `None` waits indefinitely.
///
/// # Errors
///
/// Fails with [`FlowError::Drained`] if the channel will never produce
/// another value. Call it from a stage so the failure reaches the
/// pipeline's error handler.
pub fn read_channel<C>(channel: &C, timeout: Option<Duration>) -> Result<Next, FlowError>
where
    C: Channel + ?Sized,
{
    if channel.drained() {
        return Err(FlowError::Drained);
    }
    if let Some(value) = channel.dequeue() {
        return Ok(Next::Value(value));
    }
    Ok(Next::Deferred(channel.poll(timeout)))
}

/// Builds a stage that waits for `read` and combines its value with the
/// stage input.
///
/// The read and the merge run as a nested one-stage pipeline, so a pending
/// read suspends the caller and a failed read or merge is a failure of
/// this stage.
pub fn read_merge<R, M, T>(name: impl Into<String>, read: R, merge: M) -> Arc<dyn Stage>
where
    R: Fn() -> Result<Next, FlowError> + Send + Sync + 'static,
    M: Fn(Value, Value) -> Result<T, FlowError> + Send + Sync + 'static,
    T: Into<Next> + 'static,
{
    let name = name.into();
    let merge = Arc::new(merge);
    let merge_name = format!("{name}.merge");

    Arc::new(FnStage::new(name.clone(), move |input: Value| {
        let read_value = read()?;
        let merge = merge.clone();
        let merge_stage: Arc<dyn Stage> = Arc::new(FnStage::new(merge_name.clone(), move |value: Value| {
            merge(input.clone(), value)
        }));
        let merged = Pipeline::from_parts(name.clone(), vec![merge_stage], None, Default::default());
        Ok(merged.invoke(read_value, CallScope::Nested))
    }))
}

/// Builds a stage that replaces its input with the next value from
/// `channel`.
pub fn read_stage<C>(name: impl Into<String>, channel: Arc<C>, timeout: Option<Duration>) -> Arc<dyn Stage>
where
    C: Channel + ?Sized + 'static,
{
    Arc::new(FnStage::new(name, move |_input: Value| {
        read_channel(channel.as_ref(), timeout)
    }))
}
