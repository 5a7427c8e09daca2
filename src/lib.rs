// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bodytrace - HTTP body capture for distributed traces.
//!
//! Records the request and response bodies flowing through an instrumented
//! server or client as attributes on the span of the HTTP exchange, without
//! ever changing what the application reads or writes.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`capture`] - Content gate, bounded buffers, I/O association, reentrancy
//!   guard, finalizer and the correlation engine tying them together
//! - [`config`] - Capture settings, layering and validation
//! - [`error`] - Error types and result aliases
//! - [`telemetry`] - Tracing-backed spans, subscriber setup and capture metrics
//!
//! # Guarantees
//!
//! - At most one attribute write per body, however many completion signals
//!   race for it
//! - Memory per body is bounded by the configured cap
//! - Failures inside capture are logged and counted; they never surface in
//!   the instrumented call
//!
//! # Example
//!
//! ```rust,ignore
//! use std::io::Read;
//! use std::sync::Arc;
//! use bodytrace::capture::{BodyDescriptor, CaptureEngine, CaptureReader};
//! use bodytrace::config::CaptureConfig;
//! use bodytrace::telemetry::TracingSpan;
//!
//! let engine = Arc::new(CaptureEngine::new(CaptureConfig::default())?);
//! let span = TracingSpan::shared(bodytrace::body_span!("http_request"));
//! let ctx = engine.create_context(span, BodyDescriptor::request(Some("application/json"), Some(15)));
//!
//! let mut body = CaptureReader::new(request_stream, Arc::clone(&engine), ctx);
//! let mut text = String::new();
//! body.read_to_string(&mut text)?; // span now has http.request.body
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use capture::{
    BodyAttribute, BodyDescriptor, CaptureContext, CaptureEngine, CompletionSignal, IoHandle,
    IoKind, Progress, TraceSpan,
};
pub use config::{resolve_config, CaptureConfig, CaptureSettings};
pub use error::{CaptureError, ConfigError, Result};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
