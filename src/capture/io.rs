// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Blocking I/O wrappers that report progress and completion to the engine.
//!
//! Each wrapper owns the [`IoHandle`] that identifies it, so dropping the
//! wrapper makes its association evictable. Without a context a wrapper is
//! a plain pass-through. Errors from the wrapped object pass through
//! unchanged and never finalize a capture.

use std::fmt;
use std::io::{self, BufRead, Read, Write};
use std::sync::Arc;

use super::attach;
use super::context::{CaptureContext, Progress};
use super::engine::{CaptureEngine, CompletionSignal};
use super::reentrancy::OperationKey;
use super::registry::{IoHandle, IoKind};

/// A byte stream whose reads are captured.
///
/// Reading to end-of-data, `fill_buf` returning nothing, or
/// [`close`](Self::close) finalizes the capture.
pub struct CaptureReader<R> {
    inner: R,
    engine: Arc<CaptureEngine>,
    handle: IoHandle,
}

impl<R> CaptureReader<R> {
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

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Reads made directly on the inner reader are not captured.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Close the stream, finalizing any capture in progress.
    pub fn close(self) -> R {
        self.engine
            .on_completion_signal(&self.handle, CompletionSignal::Closed);
        self.inner
    }

    fn key() -> OperationKey {
        OperationKey::of::<Self>()
    }
}

impl<R: Read> Read for CaptureReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let scope = self.engine.enter(Self::key());
        let n = self.inner.read(buf)?;
        if scope.is_outermost() {
            if n == 0 && !buf.is_empty() {
                self.engine
                    .on_completion_signal(&self.handle, CompletionSignal::EndOfData);
            } else {
                self.engine.on_progress(&self.handle, Progress::Bytes(&buf[..n]));
            }
        }
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CaptureReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let scope = self.engine.enter(Self::key());
        let available = self.inner.fill_buf()?;
        if scope.is_outermost() && available.is_empty() {
            self.engine
                .on_completion_signal(&self.handle, CompletionSignal::NoMoreData);
        }
        Ok(available)
    }

    fn consume(&mut self, amt: usize) {
        let scope = self.engine.enter(Self::key());
        if scope.is_outermost() && amt > 0 {
            // `consume` never exceeds the last `fill_buf`, which is still
            // buffered, so this does not touch the underlying source
            if let Ok(available) = self.inner.fill_buf() {
                let n = amt.min(available.len());
                self.engine
                    .on_progress(&self.handle, Progress::Bytes(&available[..n]));
            }
        }
        self.inner.consume(amt);
    }

    /// Counted once as a whole line; the `fill_buf`/`consume` calls it is
    /// built from run nested and are skipped. A line that is not UTF-8 is
    /// consumed from the stream, so it is still captured before the error.
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        let scope = self.engine.enter(Self::key());
        let mut bytes = Vec::new();
        let n = self.read_until(b'\n', &mut bytes)?;
        if scope.is_outermost() {
            if n == 0 {
                self.engine
                    .on_completion_signal(&self.handle, CompletionSignal::EndOfData);
            } else {
                self.engine.on_progress(&self.handle, Progress::Bytes(&bytes));
            }
        }
        let line = std::str::from_utf8(&bytes).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8")
        })?;
        buf.push_str(line);
        Ok(n)
    }
}

impl<R> fmt::Debug for CaptureReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureReader")
            .field("handle", &self.handle)
            .finish()
    }
}

/// A byte sink whose writes are captured. [`close`](Self::close) finalizes.
pub struct CaptureWriter<W> {
    inner: W,
    engine: Arc<CaptureEngine>,
    handle: IoHandle,
}

impl<W> CaptureWriter<W> {
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

    fn key() -> OperationKey {
        OperationKey::of::<Self>()
    }
}

impl<W: Write> CaptureWriter<W> {
    /// Flush and finalize the capture. A failed flush is returned and does
    /// not finalize.
    pub fn close(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        self.engine
            .on_completion_signal(&self.handle, CompletionSignal::Closed);
        Ok(())
    }
}

impl<W: Write> Write for CaptureWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let scope = self.engine.enter(Self::key());
        let n = self.inner.write(buf)?;
        if scope.is_outermost() {
            self.engine.on_progress(&self.handle, Progress::Bytes(&buf[..n]));
        }
        Ok(n)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let scope = self.engine.enter(Self::key());
        self.inner.write_all(buf)?;
        if scope.is_outermost() {
            self.engine.on_progress(&self.handle, Progress::Bytes(buf));
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W> fmt::Debug for CaptureWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureWriter")
            .field("handle", &self.handle)
            .finish()
    }
}

/// A character sink whose writes are captured.
pub struct CaptureCharWriter<W> {
    inner: W,
    engine: Arc<CaptureEngine>,
    handle: IoHandle,
}

impl<W: fmt::Write> CaptureCharWriter<W> {
    pub fn new(inner: W, engine: Arc<CaptureEngine>, ctx: Option<Arc<CaptureContext>>) -> Self {
        let handle = attach(&engine, IoKind::CharWriter, ctx);
        Self {
            inner,
            engine,
            handle,
        }
    }

    pub fn handle(&self) -> &IoHandle {
        &self.handle
    }

    /// Close the writer, finalizing the capture.
    pub fn close(self) -> W {
        self.engine
            .on_completion_signal(&self.handle, CompletionSignal::Closed);
        self.inner
    }
}

impl<W: fmt::Write> fmt::Write for CaptureCharWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let scope = self.engine.enter(OperationKey::of::<Self>());
        self.inner.write_str(s)?;
        if scope.is_outermost() {
            self.engine.on_progress(&self.handle, Progress::Str(s));
        }
        Ok(())
    }
}

/// Capture for frameworks that hand over a body as discrete chunks.
pub struct ChunkCapture {
    engine: Arc<CaptureEngine>,
    handle: IoHandle,
}

impl ChunkCapture {
    pub fn new(engine: Arc<CaptureEngine>, ctx: Option<Arc<CaptureContext>>) -> Self {
        let handle = attach(&engine, IoKind::ChunkHandler, ctx);
        Self { engine, handle }
    }

    pub fn handle(&self) -> &IoHandle {
        &self.handle
    }

    pub fn on_chunk(&self, chunk: &[u8]) {
        self.engine.on_progress(&self.handle, Progress::Bytes(chunk));
    }

    /// The framework reported the last chunk.
    pub fn on_end(&self) {
        self.engine
            .on_completion_signal(&self.handle, CompletionSignal::NoMoreData);
    }
}
