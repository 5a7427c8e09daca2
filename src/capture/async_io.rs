// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tokio counterparts of the blocking wrappers in [`super::io`].

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::attach;
use super::context::{CaptureContext, Progress};
use super::engine::{CaptureEngine, CompletionSignal};
use super::reentrancy::OperationKey;
use super::registry::{IoHandle, IoKind};

/// An async byte stream whose reads are captured. A read that completes
/// without filling anything finalizes the capture.
pub struct CaptureAsyncReader<R> {
    inner: R,
    engine: Arc<CaptureEngine>,
    handle: IoHandle,
}

impl<R> CaptureAsyncReader<R> {
    pub fn new(inner: R, engine: Arc<CaptureEngine>, ctx: Option<Arc<CaptureContext>>) -> Self {
        let handle = attach(&engine, IoKind::ByteStream, ctx);
        Self {
            inner,
            engine,
            handle,
        }
    }

    pub fn handle(&self) -> &IoHandle {
        &self.handle
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CaptureAsyncReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let scope = this.engine.enter(OperationKey::of::<Self>());
        let before = buf.filled().len();
        let wanted = buf.remaining() > 0;

        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            if scope.is_outermost() {
                let filled = &buf.filled()[before..];
                if filled.is_empty() && wanted {
                    this.engine
                        .on_completion_signal(&this.handle, CompletionSignal::EndOfData);
                } else {
                    this.engine.on_progress(&this.handle, Progress::Bytes(filled));
                }
            }
        }
        poll
    }
}

impl<R> fmt::Debug for CaptureAsyncReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureAsyncReader")
            .field("handle", &self.handle)
            .finish()
    }
}

/// An async byte sink whose writes are captured. A successful shutdown
/// finalizes the capture.
pub struct CaptureAsyncWriter<W> {
    inner: W,
    engine: Arc<CaptureEngine>,
    handle: IoHandle,
}

impl<W> CaptureAsyncWriter<W> {
    pub fn new(inner: W, engine: Arc<CaptureEngine>, ctx: Option<Arc<CaptureContext>>) -> Self {
        let handle = attach(&engine, IoKind::ByteSink, ctx);
        Self {
            inner,
            engine,
            handle,
        }
    }

    pub fn handle(&self) -> &IoHandle {
        &self.handle
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for CaptureAsyncWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let scope = this.engine.enter(OperationKey::of::<Self>());
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            if scope.is_outermost() {
                this.engine.on_progress(&this.handle, Progress::Bytes(&buf[..n]));
            }
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_shutdown(cx);
        if let Poll::Ready(Ok(())) = poll {
            this.engine
                .on_completion_signal(&this.handle, CompletionSignal::Closed);
        }
        poll
    }
}

impl<W> fmt::Debug for CaptureAsyncWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureAsyncWriter")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::engine::BodyDescriptor;
    use crate::capture::span::{AttributeValue, MockTraceSpan};
    use crate::config::CaptureConfig;
    use mockall::predicate::eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn engine() -> Arc<CaptureEngine> {
        Arc::new(CaptureEngine::new(CaptureConfig::default()).unwrap())
    }

    fn span_expecting(key: &'static str, body: &str) -> MockTraceSpan {
        let mut span = MockTraceSpan::new();
        span.expect_is_recording().return_const(true);
        span.expect_set_attribute()
            .with(eq(key), eq(AttributeValue::Str(body.to_string())))
            .times(1)
            .return_const(());
        span
    }

    #[tokio::test]
    async fn test_async_read_to_end() {
        let engine = engine();
        let ctx = engine
            .create_context(
                Arc::new(span_expecting("http.request.body", "query=%7Bme%7D")),
                BodyDescriptor::request(Some("application/x-www-form-urlencoded"), Some(14)),
            )
            .unwrap();

        let source: &[u8] = b"query=%7Bme%7D";
        let mut reader = CaptureAsyncReader::new(source, Arc::clone(&engine), Some(Arc::clone(&ctx)));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"query=%7Bme%7D");
        assert!(ctx.is_captured());
        assert_eq!(engine.active_associations(), 0);
    }

    #[tokio::test]
    async fn test_async_read_truncates_to_declared_length() {
        let engine = engine();
        let mut span = span_expecting("http.request.body", "{\"a\"");
        span.expect_set_attribute()
            .with(eq("http.request.body.truncated"), eq(AttributeValue::Bool(true)))
            .times(1)
            .return_const(());
        let ctx = engine
            .create_context(
                Arc::new(span),
                BodyDescriptor::request(Some("application/json"), Some(4)),
            )
            .unwrap();

        let source: &[u8] = b"{\"a\":1}";
        let mut reader = CaptureAsyncReader::new(source, Arc::clone(&engine), Some(Arc::clone(&ctx)));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out.len(), 7);
        assert!(ctx.buffer().is_truncated());
        assert_eq!(engine.metrics().units_dropped, 3);
    }

    #[tokio::test]
    async fn test_async_writer_shutdown_finalizes() {
        let engine = engine();
        let ctx = engine
            .create_context(
                Arc::new(span_expecting("http.response.body", "{\"data\":null}")),
                BodyDescriptor::response(Some("application/graphql-response+json"), None),
            )
            .unwrap();

        let mut writer = CaptureAsyncWriter::new(Vec::new(), Arc::clone(&engine), Some(Arc::clone(&ctx)));
        writer.write_all(b"{\"data\":").await.unwrap();
        writer.write_all(b"null}").await.unwrap();
        assert!(!ctx.is_captured());
        writer.shutdown().await.unwrap();

        assert!(ctx.is_captured());
        assert_eq!(writer.get_ref(), b"{\"data\":null}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_completion_race_writes_once() {
        let engine = engine();
        let mut span = MockTraceSpan::new();
        span.expect_is_recording().return_const(true);
        span.expect_set_attribute().times(1).return_const(());
        let ctx = engine
            .create_context(Arc::new(span), BodyDescriptor::response(Some("application/json"), None))
            .unwrap();

        let io = IoHandle::new(IoKind::ChunkHandler);
        engine.associate(&io, Arc::clone(&ctx));
        engine.on_progress(&io, Progress::Bytes(b"{}"));

        let io = Arc::new(io);
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let ctx = Arc::clone(&ctx);
                let io = Arc::clone(&io);
                tokio::spawn(async move {
                    match i % 3 {
                        0 => engine.on_completion_signal(&io, CompletionSignal::AsyncComplete),
                        1 => engine.on_completion_signal(&io, CompletionSignal::AsyncError),
                        _ => {
                            engine.finalize_context(&ctx);
                        }
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(engine.metrics().finalized, 1);
        assert_eq!(ctx.render(), "{}");
    }
}
