//! # Chainflow
//!
//! Composable stage pipelines that may complete synchronously or suspend on
//! pending results, driven by an explicit loop instead of coroutines.
//!
//! Chainflow provides:
//!
//! - **Deferred**: a single-resolution result with success and failure outcomes
//! - **Pipelines**: immutable stage lists with an optional error handler
//! - **Redirects**: jump into another pipeline, restart, or complete early
//! - **An engine**: a stack-safe trampoline with loop detection
//! - **Helpers**: blocking-call adapters, timed channel reads, blocking waits
//!
//! ## Quick Start
//!
//! ```rust
//! use chainflow::prelude::*;
//! use serde_json::json;
//!
//! let pipeline = Pipeline::builder("double-then-add")
//!     .stage_fn("double", |v| Ok(json!(v.as_i64().unwrap_or(0) * 2)))
//!     .stage_fn("add", |v| Ok(json!(v.as_i64().unwrap_or(0) + 1)))
//!     .build()?;
//!
//! let result = pipeline.call(json!(20));
//! assert_eq!(wait_for_result(&result, None)?, json!(41));
//! # Ok::<(), FlowError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod deferred;
pub mod engine;
pub mod errors;
pub mod helpers;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod stages;
pub mod testing;

pub use deferred::{siphon_result, wait_for_result, Deferred, Outcome};
pub use errors::FlowError;
pub use pipeline::{complete, redirect, restart, CallScope, ErrorHandler, Pipeline, Redirect};
pub use serde_json::Value;
pub use stages::{Next, Stage};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::deferred::{siphon_result, wait_for_result, Deferred, Outcome};
    pub use crate::errors::{FlowError, PipelineValidationError};
    pub use crate::helpers::{blocking, read_channel, read_merge, read_stage};
    pub use crate::pipeline::{
        complete, redirect, restart, CallScope, ErrorHandler, FlowConfig, Pipeline,
        PipelineBuilder, Redirect, RedirectTarget, RedirectValue,
    };
    pub use crate::queue::{Channel, MessageQueue};
    pub use crate::stages::{FnStage, Next, Stage};
    pub use serde_json::Value;
}
