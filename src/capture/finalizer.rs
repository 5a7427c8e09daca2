// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! One-shot conversion of a buffered body into a span attribute.

use tracing::debug;

use super::context::{BodyAttribute, CaptureContext};
use super::span::{AttributeValue, TraceSpan};

/// What a finalize call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Another caller already finalized this context.
    AlreadyCaptured,
    /// The body was written to the context's span.
    Attached,
    /// The span had ended; the body went to a short-lived child span.
    Fallback,
}

impl FinalizeOutcome {
    /// Whether this call was the one that wrote the body.
    pub fn wrote(self) -> bool {
        !matches!(self, FinalizeOutcome::AlreadyCaptured)
    }
}

/// Writes captured bodies to spans, exactly once per context.
#[derive(Debug, Clone, Copy)]
pub struct CaptureFinalizer {
    mark_truncated: bool,
}

impl CaptureFinalizer {
    pub fn new(mark_truncated: bool) -> Self {
        Self { mark_truncated }
    }

    /// Finalize `ctx`. Safe to call any number of times from any thread;
    /// only the caller that wins the compare-and-set on `captured` renders
    /// the buffer and writes the attribute.
    pub fn finalize(&self, ctx: &CaptureContext) -> FinalizeOutcome {
        if !ctx.try_mark_captured() {
            return FinalizeOutcome::AlreadyCaptured;
        }

        ctx.finish_decoding();
        let body = ctx.render();
        let truncated = self.mark_truncated && ctx.buffer().is_truncated();
        let span = ctx.span();

        if span.is_recording() {
            write_body(span.as_ref(), ctx.attribute(), body, truncated);
            debug!(capture = %ctx.id(), attribute = %ctx.attribute(), truncated, "body captured");
            return FinalizeOutcome::Attached;
        }

        // The span finished first; leave it untouched and record the body
        // on a child that ends immediately
        let child = span.start_child();
        write_body(child.as_ref(), ctx.attribute(), body, truncated);
        child.end();
        debug!(
            capture = %ctx.id(),
            attribute = %ctx.attribute(),
            truncated,
            "span already ended, body captured on child span"
        );
        FinalizeOutcome::Fallback
    }
}

impl Default for CaptureFinalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

fn write_body(span: &dyn TraceSpan, attribute: BodyAttribute, body: String, truncated: bool) {
    span.set_attribute(attribute.key(), AttributeValue::Str(body));
    if truncated {
        span.set_attribute(attribute.truncated_key(), AttributeValue::Bool(true));
    }
}
