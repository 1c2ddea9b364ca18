//! The execution engine.
//!
//! Drives one pipeline invocation to completion as an explicit loop over
//! an [`ExecutionContext`]. Each iteration, in order:
//!
//! 1. fails the invocation if the error-redirect counter exceeds the cap;
//! 2. follows a redirect to its target's first stage;
//! 3. unwraps a resolved nested result, or suspends on a pending one;
//! 4. succeeds when no stages remain;
//! 5. applies the next stage inside a failure boundary.
//!
//! Suspension registers a callback on the pending result and returns
//! without blocking. The callback re-enters the same loop on whatever
//! thread resolves the result. The stack never grows with the number of
//! stages or redirects.

mod context;
mod handler;


pub use handler::logging_handler;

use crate::deferred::{Deferred, Outcome};
use crate::errors::FlowError;
use crate::pipeline::{CallScope, Pipeline};
use crate::stages::{Next, Stage};
use context::ExecutionContext;
use handler::handle_failure;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Starts an invocation and returns its outer result.
pub(crate) fn start(pipeline: Pipeline, input: Next, scope: CallScope) -> Deferred {
    let outer = Deferred::pending();
    let ctx = ExecutionContext::new(pipeline, input, scope, outer.clone());
    debug!(
        invocation = %ctx.id,
        pipeline = ctx.pipeline.name(),
        ?scope,
        "Starting pipeline"
    );
    drive(ctx);
    outer
}

fn drive(mut ctx: ExecutionContext) {
    loop {
        if ctx.counter > ctx.loop_limit {
            warn!(
                invocation = %ctx.id,
                pipeline = ctx.pipeline.name(),
                counter = ctx.counter,
                "Loop detected; abandoning invocation"
            );
            ctx.outer.resolve_failure(FlowError::LoopDetected {
                initial: ctx.initial_value(),
                limit: ctx.loop_limit,
            });
            return;
        }

        match ctx.take_current() {
            Next::Redirect(redirect) => {
                debug!(
                    invocation = %ctx.id,
                    from = ctx.pipeline.name(),
                    restart = redirect.is_restart(),
                    "Following redirect"
                );
                ctx.follow(redirect);
            }
            Next::Deferred(nested) => match nested.peek() {
                Some(Ok(value)) => {
                    ctx.current = Next::Value(value);
                    ctx.counter = 0;
                }
                Some(Err(failure)) => {
                    if !recover(&mut ctx, failure) {
                        return;
                    }
                }
                None => {
                    suspend(ctx, &nested);
                    return;
                }
            },
            Next::Value(value) => {
                let Some(stage) = ctx.pipeline.stage(ctx.position).cloned() else {
                    trace!(invocation = %ctx.id, pipeline = ctx.pipeline.name(), "Pipeline completed");
                    ctx.outer.resolve_success(value);
                    return;
                };
                ctx.position += 1;

                match apply_stage(&ctx, &stage, value) {
                    Ok(next) => {
                        // Only a plain value is progress here. A nested result
                        // counts once it resolves successfully; a redirect never.
                        if matches!(next, Next::Value(_)) {
                            ctx.counter = 0;
                        }
                        ctx.current = next;
                    }
                    Err(failure) => {
                        if !recover(&mut ctx, failure) {
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Routes a failure through the error handler. Returns false when the
/// invocation is finished.
fn recover(ctx: &mut ExecutionContext, failure: FlowError) -> bool {
    match handle_failure(ctx, failure) {
        Some(redirect) => {
            ctx.counter += 1;
            ctx.current = Next::Redirect(redirect);
            true
        }
        None => false,
    }
}

fn suspend(ctx: ExecutionContext, nested: &Deferred) {
    debug!(
        invocation = %ctx.id,
        pipeline = ctx.pipeline.name(),
        position = ctx.position,
        "Suspending on pending result"
    );
    nested.on_resolve(move |outcome| resume(ctx, outcome));
}

fn resume(mut ctx: ExecutionContext, outcome: Outcome) {
    debug!(
        invocation = %ctx.id,
        pipeline = ctx.pipeline.name(),
        success = outcome.is_ok(),
        "Resuming"
    );
    match outcome {
        Ok(value) => {
            ctx.current = Next::Value(value);
            ctx.counter = 0;
        }
        Err(failure) => {
            if !recover(&mut ctx, failure) {
                return;
            }
        }
    }
    drive(ctx);
}

fn apply_stage(ctx: &ExecutionContext, stage: &Arc<dyn Stage>, input: serde_json::Value) -> Result<Next, FlowError> {
    trace!(
        invocation = %ctx.id,
        pipeline = ctx.pipeline.name(),
        stage = stage.name(),
        "Applying stage"
    );
    if !ctx.catch_panics {
        return stage.apply(input);
    }

    catch_unwind(AssertUnwindSafe(|| stage.apply(input))).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(
            invocation = %ctx.id,
            stage = stage.name(),
            panic = %message,
            "Stage panicked"
        );
        Err(FlowError::Panicked {
            stage: stage.name().to_string(),
            message,
        })
    })
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
