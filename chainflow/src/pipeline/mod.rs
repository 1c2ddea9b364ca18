//! Pipeline definitions.
//!
//! This module provides:
//! - Pipelines: immutable stage lists with an optional error handler
//! - A validating builder
//! - Redirect signals, including restart and complete
//! - Execution configuration
//!
//! A [`Pipeline`] is a handle that owns its definition. Cloning it is cheap
//! and every call starts an independent execution.

mod builder;
mod config;
mod redirect;

pub use builder::PipelineBuilder;
pub use config::{FlowConfig, DEFAULT_LOOP_LIMIT};
pub use redirect::{complete, redirect, restart, Redirect, RedirectTarget, RedirectValue};

use crate::deferred::Deferred;
use crate::engine;
use crate::errors::FlowError;
use crate::stages::{Next, Stage};
use serde_json::Value;
use std::sync::Arc;

/// Decides whether a failure is recovered by redirecting.
pub type ErrorHandler = Arc<dyn Fn(&FlowError) -> Option<Redirect> + Send + Sync>;

/// Where a pipeline call happens.
///
/// Top-level calls without an error handler get a handler that logs
/// failures. Calls made from inside another pipeline's stages should be
/// nested so the failure is logged once, by the outermost pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallScope {
    /// Called from ordinary code.
    #[default]
    TopLevel,
    /// Called from within a running stage.
    Nested,
}

struct PipelineDef {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    error_handler: Option<ErrorHandler>,
    config: FlowConfig,
}

/// An immutable, reusable pipeline.
#[derive(Clone)]
pub struct Pipeline {
    def: Arc<PipelineDef>,
}

impl Pipeline {
    /// Creates a pipeline builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Creates an anonymous pipeline from stages, with no error handler.
    #[must_use]
    pub fn from_stages(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self::from_parts("pipeline", stages, None, FlowConfig::default())
    }

    pub(crate) fn from_parts(
        name: impl Into<String>,
        stages: Vec<Arc<dyn Stage>>,
        error_handler: Option<ErrorHandler>,
        config: FlowConfig,
    ) -> Self {
        Self {
            def: Arc::new(PipelineDef {
                name: name.into(),
                stages,
                error_handler,
                config,
            }),
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.def.stages.len()
    }

    /// Returns the stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.def.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns the stage at `index`.
    #[must_use]
    pub fn stage(&self, index: usize) -> Option<&Arc<dyn Stage>> {
        self.def.stages.get(index)
    }

    /// Returns the error handler, if one was configured.
    #[must_use]
    pub fn error_handler(&self) -> Option<&ErrorHandler> {
        self.def.error_handler.as_ref()
    }

    /// Returns true if an error handler was configured.
    #[must_use]
    pub fn has_error_handler(&self) -> bool {
        self.def.error_handler.is_some()
    }

    /// Returns the execution configuration.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.def.config
    }

    /// Returns true if both handles share one definition.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }

    /// Starts a top-level execution with `input`.
    pub fn call(&self, input: impl Into<Value>) -> Deferred {
        self.invoke(Next::Value(input.into()), CallScope::TopLevel)
    }

    /// Starts an execution from inside another pipeline's stage.
    pub fn call_nested(&self, input: impl Into<Value>) -> Deferred {
        self.invoke(Next::Value(input.into()), CallScope::Nested)
    }

    /// Starts an execution.
    ///
    /// The input may itself be pending; the pipeline then waits for it
    /// before running its first stage. The returned result resolves exactly
    /// once, possibly before this call returns.
    pub fn invoke(&self, input: Next, scope: CallScope) -> Deferred {
        engine::start(self.clone(), input, scope)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.def.name)
            .field("stages", &self.stage_names())
            .field("has_error_handler", &self.has_error_handler())
            .finish()
    }
}
