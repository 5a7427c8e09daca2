// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! `CaptureSettings` is the partial, all-optional form an outer
//! configuration layer deserializes. `CaptureConfig` is the resolved form
//! the engine runs with.

use serde::{Deserialize, Serialize};

/// Default cap on captured body size (128 KiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 128 * 1024;

/// Default number of associations between registry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: usize = 64;

/// Content-type fragments considered safe to capture as text.
pub const DEFAULT_CAPTURABLE_CONTENT_TYPES: &[&str] =
    &["json", "x-www-form-urlencoded", "graphql"];

/// Partial capture settings, as found in one configuration source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSettings {
    /// Master switch for body capture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Capture request bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_request_body: Option<bool>,

    /// Capture response bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_response_body: Option<bool>,

    /// Upper bound on bytes (or chars) captured per body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_body_size_bytes: Option<usize>,

    /// Content-type fragments eligible for capture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capturable_content_types: Option<Vec<String>>,

    /// Emit a `.truncated` companion attribute when data was dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_truncated: Option<bool>,

    /// Associations between sweeps of unreachable registry entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval: Option<usize>,
}

/// Fully resolved capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    pub enabled: bool,
    pub capture_request_body: bool,
    pub capture_response_body: bool,
    pub max_body_size_bytes: usize,
    pub capturable_content_types: Vec<String>,
    pub mark_truncated: bool,
    pub sweep_interval: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_request_body: true,
            capture_response_body: true,
            max_body_size_bytes: DEFAULT_MAX_BODY_SIZE,
            capturable_content_types: DEFAULT_CAPTURABLE_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mark_truncated: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CaptureConfig {
    /// Configuration with capture switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the body size cap.
    pub fn with_max_body_size(mut self, max: usize) -> Self {
        self.max_body_size_bytes = max;
        self
    }

    /// Replace the content-type allow-list.
    pub fn with_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capturable_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the truncated companion attribute.
    pub fn with_mark_truncated(mut self, mark: bool) -> Self {
        self.mark_truncated = mark;
        self
    }

    /// Set the registry sweep interval.
    pub fn with_sweep_interval(mut self, interval: usize) -> Self {
        self.sweep_interval = interval;
        self
    }
}
