// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded body capture correlated with trace spans.
//!
//! A framework adapter drives the [`CaptureEngine`]:
//!
//! 1. On request/response start, [`CaptureEngine::create_context`] checks
//!    the content type and sizes a buffer from the declared length
//! 2. Each I/O object carrying the body is [associated](CaptureEngine::associate)
//!    with the context through an [`IoHandle`]
//! 3. Intercepted reads and writes report [`Progress`], outermost call only
//!    (see [`CallDepthGuard`])
//! 4. The first [`CompletionSignal`] renders the buffer and writes it to the
//!    span as `http.request.body` or `http.response.body`
//!
//! [`CaptureReader`], [`CaptureWriter`] and their async counterparts wire
//! these steps up for plain `std::io` and `tokio` streams.

mod async_io;
mod buffer;
mod charset;
mod context;
mod engine;
mod finalizer;
mod gate;
mod io;
pub mod reentrancy;
mod registry;
mod span;

use std::sync::Arc;

pub use async_io::{CaptureAsyncReader, CaptureAsyncWriter};
pub use buffer::{capacity_for, BoundedBuffer, BufferKind, WriteOutcome};
pub use charset::{resolve_charset, Charset};
pub use context::{BodyAttribute, CaptureContext, Progress};
pub use engine::{BodyDescriptor, CaptureEngine, CompletionSignal};
pub use finalizer::{CaptureFinalizer, FinalizeOutcome};
pub use gate::{parse_charset, ContentGate};
pub use io::{CaptureCharWriter, CaptureReader, CaptureWriter, ChunkCapture};
pub use reentrancy::{CallDepthGuard, OperationKey};
pub use registry::{AssociationRegistry, IoHandle, IoKind, IoRegistries};
pub use span::{AttributeValue, SharedSpan, TraceSpan};

/// Handle for a new wrapper, associated with `ctx` when there is one.
fn attach(engine: &CaptureEngine, kind: IoKind, ctx: Option<Arc<CaptureContext>>) -> IoHandle {
    let handle = IoHandle::new(kind);
    if let Some(ctx) = ctx {
        engine.associate(&handle, ctx);
    }
    handle
}
