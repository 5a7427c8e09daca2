// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Capacity-bounded body accumulators.
//!
//! Writes past capacity are silently truncated. The buffer only remembers
//! that it dropped something so the finalizer can mark the capture.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::charset::Charset;

/// Upper bound on the up-front allocation, whatever the capacity.
const INITIAL_ALLOCATION: usize = 1024;

/// Whether a buffer accumulates raw bytes or decoded characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Bytes,
    Chars,
}

/// Result of a single write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Units (bytes or chars) stored.
    pub accepted: usize,
    /// Units dropped because the buffer was full.
    pub dropped: usize,
}

/// Capacity for a body with the given declared length.
///
/// The declared length caps the buffer when known; unknown or negative
/// lengths (e.g. chunked transfer) use `max` directly.
pub fn capacity_for(declared_length: Option<i64>, max: usize) -> usize {
    match declared_length {
        Some(len) if len >= 0 => usize::try_from(len).map_or(max, |len| len.min(max)),
        _ => max,
    }
}

#[derive(Debug)]
enum Storage {
    Bytes(Vec<u8>),
    Chars { text: String, count: usize },
}

#[derive(Debug)]
struct State {
    storage: Storage,
    truncated: bool,
}

/// A thread-safe, fixed-capacity accumulator.
#[derive(Debug)]
pub struct BoundedBuffer {
    capacity: usize,
    state: Mutex<State>,
}

impl BoundedBuffer {
    /// Create a byte-oriented buffer.
    pub fn bytes(capacity: usize) -> Self {
        Self::new(BufferKind::Bytes, capacity)
    }

    /// Create a character-oriented buffer. Capacity counts chars.
    pub fn chars(capacity: usize) -> Self {
        Self::new(BufferKind::Chars, capacity)
    }

    pub fn new(kind: BufferKind, capacity: usize) -> Self {
        let initial = capacity.min(INITIAL_ALLOCATION);
        let storage = match kind {
            BufferKind::Bytes => Storage::Bytes(Vec::with_capacity(initial)),
            BufferKind::Chars => Storage::Chars {
                text: String::with_capacity(initial),
                count: 0,
            },
        };
        Self {
            capacity,
            state: Mutex::new(State {
                storage,
                truncated: false,
            }),
        }
    }

    /// Create a buffer sized from a declared content length.
    pub fn for_declared_length(kind: BufferKind, declared_length: Option<i64>, max: usize) -> Self {
        Self::new(kind, capacity_for(declared_length, max))
    }

    pub fn kind(&self) -> BufferKind {
        match self.lock().storage {
            Storage::Bytes(_) => BufferKind::Bytes,
            Storage::Chars { .. } => BufferKind::Chars,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Accumulated size in units (bytes or chars).
    pub fn len(&self) -> usize {
        match &self.lock().storage {
            Storage::Bytes(bytes) => bytes.len(),
            Storage::Chars { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Whether any write was cut short.
    pub fn is_truncated(&self) -> bool {
        self.lock().truncated
    }

    /// Append one byte if there is room.
    pub fn write_byte(&self, byte: u8) -> WriteOutcome {
        self.write_bytes(&[byte])
    }

    /// Append as many bytes as fit. Only valid for byte buffers; a char
    /// buffer counts the whole slice as dropped.
    pub fn write_bytes(&self, data: &[u8]) -> WriteOutcome {
        let capacity = self.capacity;
        let mut state = self.lock();
        let outcome = match &mut state.storage {
            Storage::Bytes(bytes) => {
                let room = capacity.saturating_sub(bytes.len());
                let take = room.min(data.len());
                bytes.extend_from_slice(&data[..take]);
                WriteOutcome {
                    accepted: take,
                    dropped: data.len() - take,
                }
            }
            Storage::Chars { .. } => WriteOutcome {
                accepted: 0,
                dropped: data.len(),
            },
        };
        state.truncated |= outcome.dropped > 0;
        outcome
    }

    /// Append one char if there is room.
    pub fn write_char(&self, c: char) -> WriteOutcome {
        let mut tmp = [0u8; 4];
        self.write_str(c.encode_utf8(&mut tmp))
    }

    /// Append as many chars as fit. Only valid for char buffers; a byte
    /// buffer counts the whole string as dropped.
    pub fn write_str(&self, data: &str) -> WriteOutcome {
        let capacity = self.capacity;
        let mut state = self.lock();
        let outcome = match &mut state.storage {
            Storage::Chars { text, count } => {
                let room = capacity.saturating_sub(*count);
                let (head, dropped) = match data.char_indices().nth(room) {
                    Some((idx, _)) => (&data[..idx], data[idx..].chars().count()),
                    None => (data, 0),
                };
                let accepted = head.chars().count();
                text.push_str(head);
                *count += accepted;
                WriteOutcome { accepted, dropped }
            }
            Storage::Bytes(_) => WriteOutcome {
                accepted: 0,
                dropped: data.chars().count(),
            },
        };
        state.truncated |= outcome.dropped > 0;
        outcome
    }

    /// Render the accumulated content without consuming it.
    ///
    /// Byte buffers decode with `charset`; char buffers ignore it.
    pub fn materialize(&self, charset: Charset) -> String {
        match &self.lock().storage {
            Storage::Bytes(bytes) => charset.decode(bytes),
            Storage::Chars { text, .. } => text.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic mid-write leaves a consistent prefix; keep using it
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
