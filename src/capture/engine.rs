// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The correlation engine: the single entry point framework hooks call.
//!
//! Per I/O object the state machine is `Unassociated -> Active -> Captured`:
//!
//! - **Unassociated**: no registry entry, every call passes through
//! - **Active**: progress writes to the buffer, a completion signal finalizes
//! - **Captured**: terminal, every call is a no-op
//!
//! Nothing here returns an error or lets a panic escape to the caller.
//! Failures are logged, counted and dropped; the worst outcome is a
//! missing attribute, never a broken request.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::trace;

use super::buffer::{BoundedBuffer, BufferKind};
use super::context::{BodyAttribute, CaptureContext, Progress};
use super::finalizer::{CaptureFinalizer, FinalizeOutcome};
use super::gate::{parse_charset, ContentGate};
use super::reentrancy::{CallDepthGuard, OperationKey};
use super::registry::{IoHandle, IoRegistries};
use super::span::SharedSpan;
use crate::config::{validate_config, CaptureConfig};
use crate::error::{CaptureError, ConfigError};
use crate::telemetry::{CaptureMetrics, MetricsSnapshot};

/// Why a body has no more data to contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// A read returned the end-of-data sentinel.
    EndOfData,
    /// A poll reported that no more data is available.
    NoMoreData,
    /// The stream, reader or writer was closed.
    Closed,
    /// The framework's asynchronous completion callback fired.
    AsyncComplete,
    /// The framework's asynchronous error callback fired.
    AsyncError,
}

impl CompletionSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionSignal::EndOfData => "end_of_data",
            CompletionSignal::NoMoreData => "no_more_data",
            CompletionSignal::Closed => "closed",
            CompletionSignal::AsyncComplete => "async_complete",
            CompletionSignal::AsyncError => "async_error",
        }
    }
}

impl fmt::Display for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request parameters for [`CaptureEngine::create_context`].
#[derive(Debug, Clone, Copy)]
pub struct BodyDescriptor<'a> {
    pub attribute: BodyAttribute,
    pub kind: BufferKind,
    /// Declared content length; `None` or negative when unknown.
    pub declared_length: Option<i64>,
    pub content_type: Option<&'a str>,
}

impl<'a> BodyDescriptor<'a> {
    pub fn request(content_type: Option<&'a str>, declared_length: Option<i64>) -> Self {
        Self {
            attribute: BodyAttribute::RequestBody,
            kind: BufferKind::Bytes,
            declared_length,
            content_type,
        }
    }

    pub fn response(content_type: Option<&'a str>, declared_length: Option<i64>) -> Self {
        Self {
            attribute: BodyAttribute::ResponseBody,
            kind: BufferKind::Bytes,
            declared_length,
            content_type,
        }
    }

    /// Accumulate characters instead of bytes.
    pub fn chars(mut self) -> Self {
        self.kind = BufferKind::Chars;
        self
    }
}

/// Correlates in-flight I/O objects with capture contexts.
///
/// Constructed by the framework adapter and shared (usually behind an
/// `Arc`) with its hooks; dropping it drops every association.
pub struct CaptureEngine {
    config: CaptureConfig,
    gate: ContentGate,
    finalizer: CaptureFinalizer,
    registries: IoRegistries<CaptureContext>,
    metrics: CaptureMetrics,
}

impl CaptureEngine {
    pub fn new(config: CaptureConfig) -> Result<Self, ConfigError> {
        validate_config(&config)?;
        Ok(Self {
            gate: ContentGate::from_config(&config),
            finalizer: CaptureFinalizer::new(config.mark_truncated),
            registries: IoRegistries::new(config.sweep_interval),
            metrics: CaptureMetrics::new(),
            config,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn gate(&self) -> &ContentGate {
        &self.gate
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Build a context for a body, or `None` if it should not be captured
    /// (capture disabled, direction disabled, or content type rejected).
    pub fn create_context(
        &self,
        span: SharedSpan,
        body: BodyDescriptor<'_>,
    ) -> Option<Arc<CaptureContext>> {
        self.guard("create_context", || {
            if !self.direction_enabled(body.attribute)
                || !self.gate.should_capture(body.content_type)
            {
                trace!(content_type = ?body.content_type, attribute = %body.attribute, "body not captured");
                self.metrics.record_context_rejected();
                return None;
            }

            let buffer = BoundedBuffer::for_declared_length(
                body.kind,
                body.declared_length,
                self.config.max_body_size_bytes,
            );
            let ctx = CaptureContext::new(
                span,
                body.attribute,
                buffer,
                parse_charset(body.content_type),
            );
            trace!(
                capture = %ctx.id(),
                attribute = %body.attribute,
                capacity = ctx.buffer().capacity(),
                "capture context created"
            );
            self.metrics.record_context_created();
            Some(Arc::new(ctx))
        })
        .flatten()
    }

    /// Associate `ctx` with `io`. A second call for the same `io` is a
    /// no-op; the first context stays.
    pub fn associate(&self, io: &IoHandle, ctx: Arc<CaptureContext>) {
        if let Some((_, evicted)) = self.guard("associate", || self.registries.associate(io, ctx)) {
            if evicted > 0 {
                self.metrics.record_evicted(evicted);
            }
        }
    }

    /// The context associated with `io`, if any.
    pub fn lookup(&self, io: &IoHandle) -> Option<Arc<CaptureContext>> {
        self.guard("lookup", || self.registries.lookup(io)).flatten()
    }

    pub fn dissociate(&self, io: &IoHandle) -> Option<Arc<CaptureContext>> {
        self.guard("dissociate", || self.registries.dissociate(io))
            .flatten()
    }

    /// Record data that passed through `io`.
    ///
    /// Callers that may nest must gate this with [`Self::enter`] and only
    /// report from the outermost call.
    pub fn on_progress(&self, io: &IoHandle, progress: Progress<'_>) {
        self.guard("on_progress", || {
            let Some(ctx) = self.registries.lookup(io) else {
                return;
            };
            let outcome = ctx.write(progress);
            if outcome.accepted > 0 || outcome.dropped > 0 {
                self.metrics.record_write(outcome.accepted, outcome.dropped);
            }
        });
    }

    /// `io` has no more data to contribute: finalize its context.
    ///
    /// The association is removed once the context is captured.
    pub fn on_completion_signal(&self, io: &IoHandle, signal: CompletionSignal) {
        self.guard("on_completion_signal", || {
            let Some(ctx) = self.registries.lookup(io) else {
                return;
            };
            trace!(capture = %ctx.id(), io = io.id(), kind = %io.kind(), %signal, "completion signal");
            self.finalize_inner(&ctx);
            self.registries.dissociate(io);
        });
    }

    /// Finalize a context directly, for async completion callbacks that
    /// hold the context rather than an I/O object.
    pub fn finalize_context(&self, ctx: &CaptureContext) -> FinalizeOutcome {
        self.guard("finalize_context", || self.finalize_inner(ctx))
            .unwrap_or(FinalizeOutcome::AlreadyCaptured)
    }

    /// Enter an intercepted call of operation class `key` on this thread.
    pub fn enter(&self, key: OperationKey) -> CallDepthGuard {
        CallDepthGuard::enter(key)
    }

    /// Remove associations whose I/O object has been dropped.
    pub fn evict_unreachable(&self) -> usize {
        let evicted = self.guard("evict_unreachable", || self.registries.sweep())
            .unwrap_or(0);
        if evicted > 0 {
            self.metrics.record_evicted(evicted);
        }
        evicted
    }

    /// Number of live associations across all I/O kinds.
    pub fn active_associations(&self) -> usize {
        self.registries.len()
    }

    fn finalize_inner(&self, ctx: &CaptureContext) -> FinalizeOutcome {
        let outcome = self.finalizer.finalize(ctx);
        if outcome.wrote() {
            self.metrics
                .record_finalized(outcome == FinalizeOutcome::Fallback);
        }
        outcome
    }

    fn direction_enabled(&self, attribute: BodyAttribute) -> bool {
        self.config.enabled
            && match attribute {
                BodyAttribute::RequestBody => self.config.capture_request_body,
                BodyAttribute::ResponseBody => self.config.capture_response_body,
            }
    }

    /// Run `f`, containing any panic. Returns `None` if it panicked.
    fn guard<T>(&self, operation: &'static str, f: impl FnOnce() -> T) -> Option<T> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                let err = CaptureError::from_panic(operation, payload.as_ref());
                err.log();
                if !err.is_recoverable() {
                    self.metrics.record_suppressed_failure();
                }
                None
            }
        }
    }
}

impl fmt::Debug for CaptureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureEngine")
            .field("config", &self.config)
            .field("active_associations", &self.active_associations())
            .finish()
    }
}
