// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry, tracing, and metrics infrastructure.
//!
//! - **Spans**: a `tracing`-backed [`TraceSpan`](crate::capture::TraceSpan)
//!   implementation and the [`body_span!`](crate::body_span) macro that
//!   declares the body fields
//! - **Metrics**: per-engine capture counters
//! - **Capture IDs**: correlate the log lines of one body across threads
//! - **Init**: subscriber setup for hosts without one
//!
//! # Usage
//!
//! ```rust,ignore
//! use bodytrace::telemetry::{init_telemetry, TelemetryConfig, TracingSpan};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! let span = TracingSpan::shared(bodytrace::body_span!("http_request"));
//! ```

mod correlation;
#[cfg(feature = "telemetry")]
mod init;
pub mod metrics;
mod spans;

pub use correlation::CaptureId;
#[cfg(feature = "telemetry")]
pub use init::{init_telemetry, LogFormat, TelemetryConfig, TelemetryGuard};
pub use metrics::{CaptureMetrics, MetricsSnapshot};
pub use spans::TracingSpan;
