//! Execution configuration.

use crate::errors::FlowError;
use serde::{Deserialize, Serialize};

/// Default cap on consecutive error redirects.
pub const DEFAULT_LOOP_LIMIT: u32 = 100;

/// Configuration captured by each pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Error redirects allowed before the invocation fails as a loop.
    pub loop_limit: u32,
    /// Log unhandled failures of top-level invocations without a handler.
    pub log_unhandled_errors: bool,
    /// Convert stage panics into failures instead of unwinding.
    pub catch_panics: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            loop_limit: DEFAULT_LOOP_LIMIT,
            log_unhandled_errors: true,
            catch_panics: true,
        }
    }
}

impl FlowConfig {
    /// Creates a new config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the loop limit.
    #[must_use]
    pub fn with_loop_limit(mut self, limit: u32) -> Self {
        self.loop_limit = limit;
        self
    }

    /// Enables or disables logging of unhandled failures.
    #[must_use]
    pub fn with_log_unhandled_errors(mut self, enabled: bool) -> Self {
        self.log_unhandled_errors = enabled;
        self
    }

    /// Enables or disables panic capture in stages.
    #[must_use]
    pub fn with_catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(document: &str) -> Result<Self, FlowError> {
        serde_json::from_str(document).map_err(|e| FlowError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FlowConfig::default();
        assert_eq!(config.loop_limit, 100);
        assert!(config.log_unhandled_errors);
        assert!(config.catch_panics);
    }

    #[test]
    fn test_builder() {
        let config = FlowConfig::new()
            .with_loop_limit(5)
            .with_log_unhandled_errors(false)
            .with_catch_panics(false);

        assert_eq!(config.loop_limit, 5);
        assert!(!config.log_unhandled_errors);
        assert!(!config.catch_panics);
    }

    #[test]
    fn test_from_json_partial() {
        let config = FlowConfig::from_json_str(r#"{"loop_limit": 3}"#).unwrap();
        assert_eq!(config, FlowConfig::new().with_loop_limit(3));
    }

    #[test]
    fn test_from_json_invalid() {
        let err = FlowConfig::from_json_str(r#"{"loop_limit": "many"}"#).unwrap_err();
        assert_eq!(err.code(), "FLOW-CONFIG");
    }
}
