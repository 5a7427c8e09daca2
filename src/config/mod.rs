// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for body capture.
//!
//! Reading configuration files and environment variables belongs to the
//! embedding agent. This module only describes the settings, merges layers
//! handed to it, and validates the result:
//! - Defaults: 128 KiB cap, JSON / form / GraphQL bodies, both directions
//! - Layers: any number of `CaptureSettings`, later layers win

mod merger;
mod types;

pub use merger::{default_config, merge_settings, validate_config};
pub use types::{
    CaptureConfig, CaptureSettings, DEFAULT_CAPTURABLE_CONTENT_TYPES, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_SWEEP_INTERVAL,
};

use crate::error::ConfigError;

/// Merge and validate settings layers.
///
/// This is the main entry point for configuration resolution.
pub fn resolve_config<I>(layers: I) -> Result<CaptureConfig, ConfigError>
where
    I: IntoIterator<Item = CaptureSettings>,
{
    let config = merge_settings(layers);
    validate_config(&config)?;
    Ok(config)
}

/// Resolve a single settings layer from an already-parsed JSON value.
pub fn resolve_from_value(value: serde_json::Value) -> Result<CaptureConfig, ConfigError> {
    let settings: CaptureSettings = serde_json::from_value(value)?;
    resolve_config([settings])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_with_no_layers() {
        let config = resolve_config(Vec::new()).unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_body_size_bytes, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.capturable_content_types.len(), 3);
    }

    #[test]
    fn test_resolve_from_value_camel_case() {
        let config = resolve_from_value(json!({
            "maxBodySizeBytes": 4096,
            "captureResponseBody": false,
            "capturableContentTypes": ["json", "xml"]
        }))
        .unwrap();

        assert_eq!(config.max_body_size_bytes, 4096);
        assert!(!config.capture_response_body);
        assert_eq!(config.capturable_content_types, vec!["json", "xml"]);
    }

    #[test]
    fn test_resolve_from_value_invalid() {
        let result = resolve_from_value(json!({ "maxBodySizeBytes": 0 }));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result = resolve_from_value(json!({ "maxBodySizeBytes": "big" }));
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }
}
