// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subscriber initialization for hosts that have none of their own.
//!
//! Embedding agents usually install their own subscriber; this is for
//! standalone use, demos and tests. Captured bodies are span fields, so
//! they only show up in fmt output when span close events are enabled.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target of every log line this crate emits.
const CAPTURE_TARGET: &str = "bodytrace";

/// Shape of fmt output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, span fields abbreviated.
    Compact,
    /// Full span context on every event.
    Full,
}

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level for everything but this crate.
    pub level: Level,

    /// Level for capture internals; `None` follows `level`.
    pub capture_level: Option<Level>,

    pub format: LogFormat,

    /// Log span closes, including recorded body fields.
    pub span_close_events: bool,

    pub ansi_colors: bool,

    /// Include file and line of each event.
    pub source_location: bool,

    /// Explicit filter directive. Takes precedence over RUST_LOG and the
    /// levels above.
    pub filter_directive: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            capture_level: None,
            format: LogFormat::Compact,
            span_close_events: false,
            ansi_colors: true,
            source_location: false,
            filter_directive: None,
        }
    }
}

impl TelemetryConfig {
    /// Capture decisions at debug, bodies printed on span close.
    pub fn development() -> Self {
        Self {
            level: Level::INFO,
            capture_level: Some(Level::DEBUG),
            format: LogFormat::Full,
            span_close_events: true,
            ansi_colors: true,
            source_location: true,
            filter_directive: None,
        }
    }

    /// Suppressed capture failures only.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            capture_level: None,
            format: LogFormat::Compact,
            span_close_events: false,
            ansi_colors: false,
            source_location: false,
            filter_directive: None,
        }
    }

    /// Everything this crate logs, nothing else.
    pub fn testing() -> Self {
        Self {
            level: Level::ERROR,
            capture_level: Some(Level::TRACE),
            format: LogFormat::Full,
            span_close_events: true,
            ansi_colors: false,
            source_location: true,
            filter_directive: None,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_capture_level(mut self, level: Level) -> Self {
        self.capture_level = Some(level);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }

    /// Filter directive built from `level` and `capture_level`.
    pub fn directive(&self) -> String {
        match self.capture_level {
            Some(capture) => format!("{},{}={}", self.level, CAPTURE_TARGET, capture),
            None => self.level.to_string(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let from_levels = || EnvFilter::new(self.directive());
        match &self.filter_directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| from_levels()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| from_levels()),
        }
    }
}

/// Guard returned by [`init_telemetry`]. Hold it for the life of the program.
pub struct TelemetryGuard {
    _private: (),
}

/// Install a global `tracing` subscriber.
///
/// Fails if a global subscriber is already set.
///
/// ```rust,ignore
/// use bodytrace::telemetry::{init_telemetry, TelemetryConfig};
///
/// let _guard = init_telemetry(&TelemetryConfig::development())?;
/// ```
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<TelemetryGuard> {
    let span_events = if config.span_close_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_ansi(config.ansi_colors)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events);

    let registry = tracing_subscriber::registry().with(config.env_filter());
    let installed = match config.format {
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init(),
        LogFormat::Full => registry.with(fmt_layer).try_init(),
    };
    installed.map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(TelemetryGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_follows_global_level() {
        let config = TelemetryConfig::default();
        assert_eq!(config.directive(), "INFO");
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.span_close_events);
    }

    #[test]
    fn test_presets() {
        assert_eq!(TelemetryConfig::development().directive(), "INFO,bodytrace=DEBUG");
        assert_eq!(TelemetryConfig::production().directive(), "WARN");
        assert_eq!(TelemetryConfig::testing().directive(), "ERROR,bodytrace=TRACE");
        assert!(TelemetryConfig::testing().span_close_events);
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::production()
            .with_level(Level::INFO)
            .with_capture_level(Level::DEBUG)
            .with_filter("bodytrace=trace")
            .with_ansi(true);

        assert_eq!(config.directive(), "INFO,bodytrace=DEBUG");
        assert_eq!(config.filter_directive.as_deref(), Some("bodytrace=trace"));
        assert!(config.ansi_colors);
    }
}
