//! Stage trait and implementations.
//!
//! Stages are the steps of a pipeline. Each one maps the flowing value to
//! a [`Next`]: a plain value for the following stage, a [`Deferred`] to wait
//! on, or a [`Redirect`] that abandons the rest of the pipeline. Returning
//! `Err` is a stage failure and goes through the pipeline's error handler.

use crate::deferred::Deferred;
use crate::errors::FlowError;
use crate::pipeline::Redirect;
use serde_json::Value;
use std::fmt::Debug;

/// What a stage hands back to the engine.
#[derive(Debug, Clone)]
pub enum Next {
    /// A value fed to the next stage.
    Value(Value),
    /// An outcome to wait on before continuing.
    Deferred(Deferred),
    /// Abandon the remaining stages and jump elsewhere.
    Redirect(Redirect),
}

impl Next {
    /// Returns the plain value, if any.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true for redirects.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }
}

impl From<Value> for Next {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Deferred> for Next {
    fn from(deferred: Deferred) -> Self {
        Self::Deferred(deferred)
    }
}

impl From<Redirect> for Next {
    fn from(redirect: Redirect) -> Self {
        Self::Redirect(redirect)
    }
}

/// Trait for pipeline stages.
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Applies the stage to the flowing value.
    fn apply(&self, input: Value) -> Result<Next, FlowError>;
}

/// A simple function-based stage.
pub struct FnStage<F> {
    name: String,
    func: F,
}

impl<F, R> FnStage<F>
where
    F: Fn(Value) -> Result<R, FlowError> + Send + Sync,
    R: Into<Next>,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .finish()
    }
}

impl<F, R> Stage for FnStage<F>
where
    F: Fn(Value) -> Result<R, FlowError> + Send + Sync,
    R: Into<Next>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: Value) -> Result<Next, FlowError> {
        (self.func)(input).map(Into::into)
    }
}

/// A stage that passes its input through unchanged.
#[derive(Debug, Clone)]
pub struct IdentityStage {
    name: String,
}

impl IdentityStage {
    /// Creates a new identity stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Stage for IdentityStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: Value) -> Result<Next, FlowError> {
        Ok(Next::Value(input))
    }
}

/// A stage that ignores its input and yields a fixed value.
#[derive(Debug, Clone)]
pub struct ConstantStage {
    name: String,
    value: Value,
}

impl ConstantStage {
    /// Creates a new constant stage.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Stage for ConstantStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, _input: Value) -> Result<Next, FlowError> {
        Ok(Next::Value(self.value.clone()))
    }
}
