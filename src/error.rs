// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for body capture.
//!
//! None of these ever reach the instrumented call path. Capture internals
//! return them so the engine boundary can log and count them in one place.

use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised inside capture logic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    #[error("Malformed content type: {0}")]
    MalformedContentType(String),

    #[error("Capture code panicked during {operation}: {message}")]
    Panicked {
        operation: &'static str,
        message: String,
    },
}

impl CaptureError {
    /// Build a panic error from a `catch_unwind` payload.
    pub fn from_panic(operation: &'static str, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { operation, message }
    }

    /// Charset and content-type problems fall back to defaults and are
    /// only worth a debug line.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownCharset(_) | Self::MalformedContentType(_))
    }

    /// Log at debug when recoverable, warn otherwise.
    pub fn log(&self) {
        if self.is_recoverable() {
            debug!(error = %self, "capture input not understood, using default");
        } else {
            warn!(error = %self, "capture failure suppressed");
        }
    }
}

/// Errors that can occur while validating capture configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

/// Result type alias for capture internals.
pub type Result<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_recoverable() {
        assert!(CaptureError::UnknownCharset("x-bogus".to_string()).is_recoverable());
        assert!(CaptureError::MalformedContentType(";;".to_string()).is_recoverable());
        assert!(!CaptureError::Panicked {
            operation: "finalize",
            message: "boom".to_string(),
        }
        .is_recoverable());
    }

    #[test]
    fn test_capture_error_from_panic_payload() {
        let payload = std::panic::catch_unwind(|| panic!("span exploded")).unwrap_err();
        let err = CaptureError::from_panic("finalize", payload.as_ref());
        match err {
            CaptureError::Panicked { operation, message } => {
                assert_eq!(operation, "finalize");
                assert_eq!(message, "span exploded");
            }
            _ => panic!("Expected Panicked"),
        }
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::invalid("maxBodySizeBytes", "must be greater than zero");
        let display = format!("{}", err);
        assert!(display.contains("maxBodySizeBytes"));
        assert!(display.contains("greater than zero"));
    }
}
