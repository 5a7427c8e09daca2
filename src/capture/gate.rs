// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Content gate: which bodies are eligible for capture, and in what charset.

use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// Decides from a content-type header whether a body may be captured as text.
#[derive(Debug, Clone)]
pub struct ContentGate {
    /// Lowercased content-type fragments.
    allowed: Vec<String>,
}

impl ContentGate {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(&config.capturable_content_types)
    }

    /// Case-insensitive substring match against the allow-list.
    ///
    /// An absent header is never capturable.
    pub fn should_capture(&self, content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type else {
            return false;
        };
        let content_type = content_type.to_ascii_lowercase();
        self.allowed
            .iter()
            .any(|fragment| content_type.contains(fragment.as_str()))
    }
}

impl Default for ContentGate {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

/// Extract the `charset=` parameter of a content-type header.
pub fn parse_charset(content_type: Option<&str>) -> Option<String> {
    let content_type = content_type?;
    match content_type.parse::<mime::Mime>() {
        Ok(parsed) => parsed
            .get_param(mime::CHARSET)
            .map(|name| name.as_str().trim_matches('"').to_string()),
        Err(_) => {
            CaptureError::MalformedContentType(content_type.to_string()).log();
            scan_charset_param(content_type)
        }
    }
}

/// Parameter scan for headers `mime` refuses, e.g. a bare `charset=utf-8`.
fn scan_charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}
