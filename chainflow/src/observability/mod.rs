//! Logging setup.
//!
//! The engine emits `tracing` events with `invocation`, `pipeline` and
//! `stage` fields. Applications install a subscriber of their choice; the
//! helpers here cover the common fmt-based setups.

use crate::errors::FlowError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Installs a global fmt subscriber filtered by `RUST_LOG`.
///
/// `default_directive` applies when `RUST_LOG` is unset, e.g.
/// `"chainflow=debug"`.
///
/// # Errors
///
/// Fails if the directive is invalid or a global subscriber is already
/// installed.
pub fn init_tracing(format: LogFormat, default_directive: &str) -> Result<(), FlowError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| FlowError::Config(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| FlowError::Config(e.to_string()))
}

/// Installs a test-friendly subscriber, ignoring repeated calls.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("chainflow=trace"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_repeated_init_is_reported() {
        init_test_tracing();
        init_test_tracing();
        assert!(init_tracing(LogFormat::Text, "info").is_err());
    }
}
