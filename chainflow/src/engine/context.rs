//! Per-invocation execution state.

use crate::deferred::Deferred;
use crate::pipeline::{CallScope, ErrorHandler, Pipeline, Redirect, RedirectTarget, RedirectValue};
use crate::stages::Next;
use serde_json::Value;
use uuid::Uuid;

use super::handler::logging_handler;

/// State owned by one pipeline invocation until its outer result resolves.
///
/// Moves into the resumption callback when execution suspends, so at most
/// one thread ever drives it.
pub(crate) struct ExecutionContext {
    /// Identifier used in log events.
    pub(crate) id: Uuid,
    /// The pipeline currently executing; changes on redirect.
    pub(crate) pipeline: Pipeline,
    /// The pipeline this invocation was started with.
    entry: Pipeline,
    /// Index of the next stage to apply.
    pub(crate) position: usize,
    /// The input of the current attempt, reused by keep-initial redirects.
    pub(crate) initial: Next,
    /// The flowing value.
    pub(crate) current: Next,
    /// Redirects taken in response to errors since the last progress.
    pub(crate) counter: u32,
    /// The result this invocation resolves exactly once.
    pub(crate) outer: Deferred,
    /// Logging handler for a top-level call of a handlerless pipeline.
    /// Applies to that pipeline only, not to redirect targets.
    pub(crate) fallback_handler: Option<ErrorHandler>,
    pub(crate) loop_limit: u32,
    pub(crate) catch_panics: bool,
}

impl ExecutionContext {
    pub(crate) fn new(pipeline: Pipeline, input: Next, scope: CallScope, outer: Deferred) -> Self {
        let id = Uuid::new_v4();
        let config = pipeline.config().clone();
        let fallback_handler = (scope == CallScope::TopLevel
            && !pipeline.has_error_handler()
            && config.log_unhandled_errors)
            .then(|| logging_handler(format!("{}#{}", pipeline.name(), id)));
        let initial = match &input {
            Next::Redirect(_) => Next::Value(Value::Null),
            other => other.clone(),
        };

        Self {
            id,
            entry: pipeline.clone(),
            pipeline,
            position: 0,
            initial,
            current: input,
            counter: 0,
            outer,
            fallback_handler,
            loop_limit: config.loop_limit,
            catch_panics: config.catch_panics,
        }
    }

    pub(crate) fn take_current(&mut self) -> Next {
        std::mem::replace(&mut self.current, Next::Value(Value::Null))
    }

    /// Jumps to the redirect's target from its first stage.
    pub(crate) fn follow(&mut self, redirect: Redirect) {
        if let RedirectTarget::Pipeline(target) = redirect.target {
            self.pipeline = target;
        }
        let start = match redirect.value {
            RedirectValue::KeepInitial => self.initial.clone(),
            RedirectValue::Value(value) => Next::Value(value),
        };
        self.position = 0;
        self.initial = start.clone();
        self.current = start;
    }

    /// The error handler for the current pipeline. The invoked pipeline
    /// falls back to the invocation's logging handler.
    pub(crate) fn error_handler(&self) -> Option<&ErrorHandler> {
        self.pipeline.error_handler().or_else(|| {
            self.fallback_handler
                .as_ref()
                .filter(|_| self.pipeline.ptr_eq(&self.entry))
        })
    }

    /// The initial value as reported by a loop-detected failure.
    pub(crate) fn initial_value(&self) -> Value {
        match &self.initial {
            Next::Value(value) => value.clone(),
            Next::Deferred(pending) => pending
                .peek()
                .and_then(Result::ok)
                .unwrap_or(Value::Null),
            Next::Redirect(_) => Value::Null,
        }
    }
}
