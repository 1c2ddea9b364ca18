//! Failure routing: the single place where a failure is either recovered
//! by a redirect or becomes the invocation's final outcome.

use super::context::ExecutionContext;
use super::panic_message;
use crate::errors::FlowError;
use crate::pipeline::{ErrorHandler, Redirect};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Offers `failure` to the active error handler.
///
/// Returns the handler's redirect, or delivers the failure to the outer
/// result and returns `None`.
pub(crate) fn handle_failure(ctx: &ExecutionContext, failure: FlowError) -> Option<Redirect> {
    let decision = ctx
        .error_handler()
        .and_then(|handler| consult(ctx, handler, &failure));

    if let Some(redirect) = decision {
        debug!(
            invocation = %ctx.id,
            pipeline = ctx.pipeline.name(),
            counter = ctx.counter,
            restart = redirect.is_restart(),
            error = %failure,
            "Error handler redirected"
        );
        return Some(redirect);
    }

    ctx.outer.resolve_failure(failure);
    None
}

fn consult(ctx: &ExecutionContext, handler: &ErrorHandler, failure: &FlowError) -> Option<Redirect> {
    match catch_unwind(AssertUnwindSafe(|| handler(failure))) {
        Ok(decision) => decision,
        Err(payload) => {
            warn!(
                invocation = %ctx.id,
                pipeline = ctx.pipeline.name(),
                panic = %panic_message(payload.as_ref()),
                "Error handler panicked; treating failure as unhandled"
            );
            None
        }
    }
}

/// Returns a handler that logs every failure and never redirects.
///
/// Top-level calls of pipelines without a handler get one of these, so an
/// unhandled failure is logged once and still delivered to the caller.
pub fn logging_handler(label: impl Into<String>) -> ErrorHandler {
    let label = label.into();
    Arc::new(move |failure: &FlowError| {
        error!(
            pipeline = %label,
            code = failure.code(),
            error = %failure,
            "Unhandled pipeline failure"
        );
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Deferred;
    use crate::pipeline::{restart, CallScope, Pipeline};
    use crate::stages::Next;
    use serde_json::json;

    fn context(pipeline: Pipeline, scope: CallScope) -> ExecutionContext {
        ExecutionContext::new(pipeline, Next::Value(json!(0)), scope, Deferred::pending())
    }

    #[test]
    fn test_redirect_leaves_outer_pending() {
        let pipeline = Pipeline::builder("retrying")
            .error_handler(|_| Some(restart(None)))
            .build()
            .unwrap();
        let ctx = context(pipeline, CallScope::TopLevel);

        assert!(handle_failure(&ctx, FlowError::stage("x")).is_some());
        assert!(!ctx.outer.is_resolved());
    }

    #[test]
    fn test_declined_failure_is_delivered() {
        let pipeline = Pipeline::builder("declining")
            .error_handler(|_| None)
            .build()
            .unwrap();
        let ctx = context(pipeline, CallScope::TopLevel);

        assert!(handle_failure(&ctx, FlowError::stage("x")).is_none());
        assert_eq!(ctx.outer.peek(), Some(Err(FlowError::stage("x"))));
    }

    #[test]
    fn test_no_handler_nested_is_delivered() {
        let ctx = context(Pipeline::from_stages(Vec::new()), CallScope::Nested);

        assert!(handle_failure(&ctx, FlowError::Drained).is_none());
        assert_eq!(ctx.outer.peek(), Some(Err(FlowError::Drained)));
    }

    #[test]
    fn test_panicking_handler_declines() {
        let pipeline = Pipeline::builder("panicky")
            .error_handler(|_| panic!("handler bug"))
            .build()
            .unwrap();
        let ctx = context(pipeline, CallScope::TopLevel);

        assert!(handle_failure(&ctx, FlowError::stage("x")).is_none());
        assert_eq!(ctx.outer.peek(), Some(Err(FlowError::stage("x"))));
    }

    #[test]
    fn test_logging_handler_declines() {
        let handler = logging_handler("test");
        assert!(handler(&FlowError::stage("logged")).is_none());
    }
}
