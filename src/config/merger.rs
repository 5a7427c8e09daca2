// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging and validation.
//!
//! Settings layers are applied in order, later layers winning.

use super::types::{CaptureConfig, CaptureSettings};
use crate::error::ConfigError;

/// Default configuration values.
pub fn default_config() -> CaptureConfig {
    CaptureConfig::default()
}

/// Merge settings layers onto the defaults.
///
/// Precedence is the iteration order: a field set in a later layer
/// overrides the same field from an earlier one.
pub fn merge_settings<I>(layers: I) -> CaptureConfig
where
    I: IntoIterator<Item = CaptureSettings>,
{
    let mut result = default_config();
    for layer in layers {
        apply_settings(&mut result, layer);
    }
    result
}

fn apply_settings(result: &mut CaptureConfig, settings: CaptureSettings) {
    if let Some(enabled) = settings.enabled {
        result.enabled = enabled;
    }

    if let Some(capture) = settings.capture_request_body {
        result.capture_request_body = capture;
    }

    if let Some(capture) = settings.capture_response_body {
        result.capture_response_body = capture;
    }

    if let Some(max) = settings.max_body_size_bytes {
        result.max_body_size_bytes = max;
    }

    if let Some(types) = settings.capturable_content_types {
        result.capturable_content_types = types;
    }

    if let Some(mark) = settings.mark_truncated {
        result.mark_truncated = mark;
    }

    if let Some(interval) = settings.sweep_interval {
        result.sweep_interval = interval;
    }
}

/// Reject configurations the engine cannot run with.
pub fn validate_config(config: &CaptureConfig) -> Result<(), ConfigError> {
    if config.max_body_size_bytes == 0 {
        return Err(ConfigError::invalid(
            "maxBodySizeBytes",
            "must be greater than zero",
        ));
    }

    if config.sweep_interval == 0 {
        return Err(ConfigError::invalid(
            "sweepInterval",
            "must be greater than zero",
        ));
    }

    if config.enabled
        && config
            .capturable_content_types
            .iter()
            .all(|t| t.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            "capturableContentTypes",
            "at least one content type is required while capture is enabled",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_no_layers_is_default() {
        assert_eq!(merge_settings(Vec::new()), CaptureConfig::default());
    }

    #[test]
    fn test_later_layer_wins() {
        let agent = CaptureSettings {
            max_body_size_bytes: Some(1024),
            capture_response_body: Some(false),
            ..Default::default()
        };
        let framework = CaptureSettings {
            max_body_size_bytes: Some(2048),
            ..Default::default()
        };

        let config = merge_settings(vec![agent, framework]);
        assert_eq!(config.max_body_size_bytes, 2048);
        assert!(!config.capture_response_body);
        assert!(config.capture_request_body);
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let config = CaptureConfig::default().with_max_body_size(0);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("maxBodySizeBytes"));
    }

    #[test]
    fn test_validate_rejects_zero_sweep_interval() {
        let config = CaptureConfig::default().with_sweep_interval(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_allow_list() {
        let empty: Vec<String> = Vec::new();
        let config = CaptureConfig::default().with_content_types(empty.clone());
        assert!(validate_config(&config).is_err());

        // Nothing is captured anyway when disabled
        let config = CaptureConfig::disabled().with_content_types(empty);
        assert!(validate_config(&config).is_ok());
    }
}
