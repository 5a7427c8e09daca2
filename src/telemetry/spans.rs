// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `tracing`-backed spans that can receive captured bodies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::Span;

use crate::capture::{AttributeValue, TraceSpan};

/// Create a tracing span with the body capture fields declared.
///
/// `tracing` only records fields declared at span creation, so spans that
/// should receive bodies must be created through this macro (or declare
/// the same fields by hand).
///
/// ```rust,ignore
/// let span = bodytrace::body_span!("http_request");
/// let handle = bodytrace::telemetry::TracingSpan::shared(span);
/// ```
#[macro_export]
macro_rules! body_span {
    ($name:literal) => {
        tracing::info_span!(
            $name,
            http.request.body = tracing::field::Empty,
            http.request.body.truncated = tracing::field::Empty,
            http.response.body = tracing::field::Empty,
            http.response.body.truncated = tracing::field::Empty,
        )
    };
    (parent: $parent:expr, $name:literal) => {
        tracing::info_span!(
            parent: $parent,
            $name,
            http.request.body = tracing::field::Empty,
            http.request.body.truncated = tracing::field::Empty,
            http.response.body = tracing::field::Empty,
            http.response.body.truncated = tracing::field::Empty,
        )
    };
}

/// A [`TraceSpan`] over a `tracing::Span`.
///
/// `tracing` spans close when their last handle drops, which would make
/// the fallback child's parent dangle. This wrapper keeps the span open
/// and tracks "ended" itself; the underlying span closes when the wrapper
/// (and every capture context holding it) is dropped.
#[derive(Debug)]
pub struct TracingSpan {
    span: Span,
    recording: AtomicBool,
}

impl TracingSpan {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            recording: AtomicBool::new(true),
        }
    }

    /// Wrap a span into a shared handle.
    pub fn shared(span: Span) -> Arc<Self> {
        Arc::new(Self::new(span))
    }

    /// Get the underlying tracing span.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl TraceSpan for TracingSpan {
    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    fn set_attribute(&self, key: &'static str, value: AttributeValue) {
        if !self.is_recording() {
            return;
        }
        match value {
            AttributeValue::Str(s) => {
                self.span.record(key, s.as_str());
            }
            AttributeValue::Bool(b) => {
                self.span.record(key, b);
            }
        }
    }

    fn start_child(&self) -> Arc<dyn TraceSpan> {
        let child = crate::body_span!(parent: &self.span, "body_capture");
        Arc::new(TracingSpan::new(child))
    }

    fn end(&self) {
        self.recording.store(false, Ordering::Release);
    }
}
