// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The per-body correlation record.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use encoding_rs::Decoder;
use once_cell::sync::OnceCell;

use super::buffer::{BoundedBuffer, BufferKind, WriteOutcome};
use super::charset::{resolve_charset, Charset};
use super::span::SharedSpan;
use crate::telemetry::CaptureId;

/// Which semantic field a captured body is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyAttribute {
    RequestBody,
    ResponseBody,
}

impl BodyAttribute {
    /// Span attribute holding the body text.
    pub fn key(self) -> &'static str {
        match self {
            BodyAttribute::RequestBody => "http.request.body",
            BodyAttribute::ResponseBody => "http.response.body",
        }
    }

    /// Companion boolean attribute set when the body was cut short.
    pub fn truncated_key(self) -> &'static str {
        match self {
            BodyAttribute::RequestBody => "http.request.body.truncated",
            BodyAttribute::ResponseBody => "http.response.body.truncated",
        }
    }
}

impl fmt::Display for BodyAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Data observed passing through an intercepted I/O call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<'a> {
    Byte(u8),
    Bytes(&'a [u8]),
    Char(char),
    Str(&'a str),
}

impl Progress<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            Progress::Bytes(b) => b.is_empty(),
            Progress::Str(s) => s.is_empty(),
            Progress::Byte(_) | Progress::Char(_) => false,
        }
    }
}

/// Links one request or response body to its span, buffer and attribute.
///
/// `captured` flips from false to true exactly once; after that every
/// write and finalize attempt is a no-op.
pub struct CaptureContext {
    id: CaptureId,
    span: SharedSpan,
    attribute: BodyAttribute,
    buffer: BoundedBuffer,
    charset_name: Option<String>,
    charset: OnceCell<Charset>,
    /// Carries partial multi-byte sequences between byte writes into a
    /// char buffer.
    decoder: Mutex<Option<Decoder>>,
    captured: AtomicBool,
}

impl CaptureContext {
    pub fn new(
        span: SharedSpan,
        attribute: BodyAttribute,
        buffer: BoundedBuffer,
        charset_name: Option<String>,
    ) -> Self {
        Self {
            id: CaptureId::new(),
            span,
            attribute,
            buffer,
            charset_name,
            charset: OnceCell::new(),
            decoder: Mutex::new(None),
            captured: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> CaptureId {
        self.id
    }

    pub fn span(&self) -> &SharedSpan {
        &self.span
    }

    pub fn attribute(&self) -> BodyAttribute {
        self.attribute
    }

    pub fn buffer(&self) -> &BoundedBuffer {
        &self.buffer
    }

    /// Declared charset, resolved on first use.
    pub fn charset(&self) -> Charset {
        *self
            .charset
            .get_or_init(|| resolve_charset(self.charset_name.as_deref()))
    }

    pub fn is_captured(&self) -> bool {
        self.captured.load(Ordering::Acquire)
    }

    /// Flip `captured` to true. Only the first caller gets `true`.
    pub(crate) fn try_mark_captured(&self) -> bool {
        self.captured
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Append observed data to the buffer. No-op once captured.
    ///
    /// Bytes written to a char buffer are decoded with the context charset
    /// and chars written to a byte buffer are encoded with it, so a byte
    /// stream and a reader over the same body can feed one context. Byte
    /// decoding is streaming: a sequence split across writes is held back
    /// until it completes.
    pub fn write(&self, progress: Progress<'_>) -> WriteOutcome {
        if self.is_captured() || progress.is_empty() {
            return WriteOutcome::default();
        }
        match (self.buffer.kind(), progress) {
            (BufferKind::Bytes, Progress::Byte(b)) => self.buffer.write_byte(b),
            (BufferKind::Bytes, Progress::Bytes(bytes)) => self.buffer.write_bytes(bytes),
            (BufferKind::Bytes, Progress::Char(c)) => {
                let mut tmp = [0u8; 4];
                let encoded = self.charset().encode(c.encode_utf8(&mut tmp));
                self.buffer.write_bytes(&encoded)
            }
            (BufferKind::Bytes, Progress::Str(s)) => {
                self.buffer.write_bytes(&self.charset().encode(s))
            }
            (BufferKind::Chars, Progress::Char(c)) => self.buffer.write_char(c),
            (BufferKind::Chars, Progress::Str(s)) => self.buffer.write_str(s),
            (BufferKind::Chars, Progress::Byte(b)) => self.decode_into_buffer(&[b], false),
            (BufferKind::Chars, Progress::Bytes(bytes)) => self.decode_into_buffer(bytes, false),
        }
    }

    /// Flush a dangling partial sequence (as U+FFFD) into a char buffer.
    /// Called once by the finalizer before rendering.
    pub(crate) fn finish_decoding(&self) {
        if self.buffer.kind() == BufferKind::Chars {
            self.decode_into_buffer(&[], true);
        }
    }

    fn decode_into_buffer(&self, bytes: &[u8], last: bool) -> WriteOutcome {
        let charset = self.charset();
        let Charset::Encoding(encoding) = charset else {
            // Latin-1 is one byte per char, nothing to carry over
            return self.buffer.write_str(&charset.decode(bytes));
        };

        let mut slot = self.decoder.lock().unwrap_or_else(PoisonError::into_inner);
        if last {
            // A finished decoder must not be fed again
            let Some(mut decoder) = slot.take() else {
                return WriteOutcome::default();
            };
            return self.buffer.write_str(&decode_chunk(&mut decoder, bytes, true));
        }
        let decoder = slot.get_or_insert_with(|| encoding.new_decoder_with_bom_removal());
        // Written under the lock so chunks land in decode order
        self.buffer.write_str(&decode_chunk(decoder, bytes, false))
    }

    /// Render the buffer as text.
    pub fn render(&self) -> String {
        self.buffer.materialize(self.charset())
    }
}

fn decode_chunk(decoder: &mut Decoder, bytes: &[u8], last: bool) -> String {
    let needed = decoder
        .max_utf8_buffer_length(bytes.len())
        .unwrap_or(bytes.len() * 3 + 4);
    let mut text = String::with_capacity(needed);
    // With `needed` reserved the whole input is consumed in one call
    let _ = decoder.decode_to_string(bytes, &mut text, last);
    text
}

impl fmt::Debug for CaptureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureContext")
            .field("id", &self.id)
            .field("attribute", &self.attribute)
            .field("charset_name", &self.charset_name)
            .field("buffered", &self.buffer.len())
            .field("capacity", &self.buffer.capacity())
            .field("captured", &self.is_captured())
            .finish()
    }
}
