//! Instrumented stages for testing.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::FlowError;
use crate::stages::{Next, Stage};

/// A stage that counts calls and passes its input through.
#[derive(Debug)]
pub struct CountingStage {
    name: String,
    calls: AtomicUsize,
}

impl CountingStage {
    /// Creates a new counting stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the stage was applied.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Stage for CountingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: Value) -> Result<Next, FlowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Next::Value(input))
    }
}

/// A stage that always fails, counting its attempts.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    error: FlowError,
    attempts: AtomicUsize,
}

impl FailingStage {
    /// Creates a stage failing with a message.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_error(name, FlowError::stage(message))
    }

    /// Creates a stage failing with a specific error.
    #[must_use]
    pub fn with_error(name: impl Into<String>, error: FlowError) -> Self {
        Self {
            name: name.into(),
            error,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Returns the number of attempts.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, _input: Value) -> Result<Next, FlowError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// A stage that records every input it sees.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    inputs: Mutex<Vec<Value>>,
}

impl RecordingStage {
    /// Creates a new recording stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Returns all recorded inputs.
    #[must_use]
    pub fn inputs(&self) -> Vec<Value> {
        self.inputs.lock().clone()
    }

    /// Clears recorded inputs.
    pub fn clear(&self) {
        self.inputs.lock().clear();
    }
}

impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: Value) -> Result<Next, FlowError> {
        self.inputs.lock().push(input.clone());
        Ok(Next::Value(input))
    }
}
