//! Error types for the chainflow engine.
//!
//! Every failure that can reach a [`Deferred`](crate::Deferred) is a
//! [`FlowError`]. Errors are cloned into every subscriber of a failed
//! result, so all variants are cheap to clone and comparable in tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// The main error type for chainflow operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// A stage failed with a message.
    #[error("Stage failed: {0}")]
    Stage(String),

    /// A stage failed with a data payload.
    #[error("Stage rejected input: {0}")]
    Rejected(Value),

    /// A stage or worker panicked.
    #[error("Stage '{stage}' panicked: {message}")]
    Panicked {
        /// The stage that panicked.
        stage: String,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// A pipeline definition was rejected at construction time.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A timed wait or channel read exceeded its bound.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The redirect counter exceeded its cap.
    #[error("Loop detected: more than {limit} redirects on error without progress")]
    LoopDetected {
        /// The initial value of the attempt that tripped the cap.
        initial: Value,
        /// The configured cap.
        limit: u32,
    },

    /// A read was attempted on a source that will never produce more values.
    #[error("Cannot read from drained source")]
    Drained,

    /// A value was written to a closed queue.
    #[error("Cannot write to closed queue")]
    Closed,

    /// A blocking worker failed; carries the input it was given.
    #[error("Blocking call failed for input {input}: {source}")]
    Blocking {
        /// The input handed to the worker.
        input: Value,
        /// The worker's failure.
        #[source]
        source: Box<FlowError>,
    },

    /// Concurrent work could not be dispatched.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// A result was dropped before anyone resolved it.
    #[error("Result abandoned before resolution")]
    Abandoned,

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration document.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlowError {
    /// Creates a stage failure from a message.
    #[must_use]
    pub fn stage(message: impl Into<String>) -> Self {
        Self::Stage(message.into())
    }

    /// Creates a stage failure carrying a data payload.
    #[must_use]
    pub fn rejected(payload: impl Into<Value>) -> Self {
        Self::Rejected(payload.into())
    }

    /// Creates a blocking-worker failure paired with its input.
    #[must_use]
    pub fn blocking(input: Value, source: Self) -> Self {
        Self::Blocking {
            input,
            source: Box::new(source),
        }
    }

    /// Returns true for timeout failures.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns true for loop-detected failures.
    #[must_use]
    pub fn is_loop_detected(&self) -> bool {
        matches!(self, Self::LoopDetected { .. })
    }

    /// Returns a stable code for the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Stage(_) | Self::Rejected(_) | Self::Panicked { .. } => "FLOW-STAGE",
            Self::Validation(_) => "FLOW-CONFIGURATION",
            Self::Timeout(_) => "FLOW-TIMEOUT",
            Self::LoopDetected { .. } => "FLOW-LOOP",
            Self::Drained => "FLOW-DRAINED",
            Self::Closed => "FLOW-CLOSED",
            Self::Blocking { .. } => "FLOW-BLOCKING",
            Self::Dispatch(_) => "FLOW-DISPATCH",
            Self::Abandoned => "FLOW-ABANDONED",
            Self::Serialization(_) => "FLOW-SERIALIZATION",
            Self::Config(_) => "FLOW-CONFIG",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::Rejected(payload) => {
                map.insert("payload".to_string(), payload.clone());
            }
            Self::LoopDetected { initial, limit } => {
                map.insert("initial".to_string(), initial.clone());
                map.insert("limit".to_string(), serde_json::json!(limit));
            }
            Self::Blocking { input, .. } => {
                map.insert("input".to_string(), input.clone());
            }
            Self::Timeout(after) => {
                map.insert("timeout_ms".to_string(), serde_json::json!(after.as_millis() as u64));
            }
            _ => {}
        }

        map
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-001-DUPLICATE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Creates contract error info whose fix hint is the default
    /// suggestion for `code`, if there is one.
    #[must_use]
    pub fn suggested(code: impl Into<String>, summary: impl Into<String>) -> Self {
        let mut info = Self::new(code, summary);
        info.fix_hint = ContractSuggestions::get(&info.code).map(String::from);
        info
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline definition is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}

/// Provides default suggestions for pipeline contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONTRACT-001-DUPLICATE" => Some(
                "Stage names identify stages in logs and errors. \
                 Give each stage in a pipeline a distinct name.",
            ),
            "CONTRACT-002-UNNAMED" => Some("Use a non-empty name for every stage and pipeline."),
            _ => None,
        }
    }
}
