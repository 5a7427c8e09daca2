// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Non-owning association of in-flight I/O objects with capture contexts.
//!
//! An I/O object is identified by an [`IoHandle`] it owns. The registry
//! keeps only a `Weak` to that identity, so it never keeps a request-scoped
//! object alive. Ids are never reused, so a stale entry can't be picked up
//! by a newer object; dead entries are dropped on sweep.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::trace;

static NEXT_IO_ID: AtomicU64 = AtomicU64::new(1);

/// The kind of I/O object being tracked. Each kind has its own registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoKind {
    /// Readable byte stream (request body input).
    ByteStream,
    /// Readable character stream.
    CharReader,
    /// Writable byte stream (response body output).
    ByteSink,
    /// Writable character stream.
    CharWriter,
    /// Handler receiving raw body chunks.
    ChunkHandler,
}

impl IoKind {
    pub const ALL: [IoKind; 5] = [
        IoKind::ByteStream,
        IoKind::CharReader,
        IoKind::ByteSink,
        IoKind::CharWriter,
        IoKind::ChunkHandler,
    ];

    fn index(self) -> usize {
        match self {
            IoKind::ByteStream => 0,
            IoKind::CharReader => 1,
            IoKind::ByteSink => 2,
            IoKind::CharWriter => 3,
            IoKind::ChunkHandler => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IoKind::ByteStream => "byte_stream",
            IoKind::CharReader => "char_reader",
            IoKind::ByteSink => "byte_sink",
            IoKind::CharWriter => "char_writer",
            IoKind::ChunkHandler => "chunk_handler",
        }
    }
}

impl fmt::Display for IoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Identity {
    id: u64,
    kind: IoKind,
}

/// Identity of one in-flight I/O object.
///
/// Clones share the identity. Once every clone is dropped the object counts
/// as unreachable and its registry entry becomes evictable.
#[derive(Debug, Clone)]
pub struct IoHandle(Arc<Identity>);

impl IoHandle {
    pub fn new(kind: IoKind) -> Self {
        Self(Arc::new(Identity {
            id: NEXT_IO_ID.fetch_add(1, Ordering::Relaxed),
            kind,
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn kind(&self) -> IoKind {
        self.0.kind
    }

    fn downgrade(&self) -> Weak<Identity> {
        Arc::downgrade(&self.0)
    }
}

impl PartialEq for IoHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for IoHandle {}

struct Entry<T> {
    owner: Weak<Identity>,
    value: Arc<T>,
}

/// Registry for a single [`IoKind`].
pub struct AssociationRegistry<T> {
    kind: IoKind,
    entries: RwLock<HashMap<u64, Entry<T>>>,
}

impl<T> AssociationRegistry<T> {
    pub fn new(kind: IoKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> IoKind {
        self.kind
    }

    /// Associate `value` with `io`.
    ///
    /// Idempotent: if `io` already has a value this is a no-op and returns
    /// `false`.
    pub fn associate(&self, io: &IoHandle, value: Arc<T>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&io.id()) {
            return false;
        }
        entries.insert(
            io.id(),
            Entry {
                owner: io.downgrade(),
                value,
            },
        );
        trace!(io = io.id(), kind = %self.kind, "associated");
        true
    }

    pub fn lookup(&self, io: &IoHandle) -> Option<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&io.id())
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Remove the association for `io`, returning the value if present.
    pub fn dissociate(&self, io: &IoHandle) -> Option<Arc<T>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&io.id())
            .map(|entry| entry.value)
    }

    /// Drop entries whose I/O object is gone. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.owner.strong_count() > 0);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One registry per [`IoKind`], with opportunistic sweeping.
pub struct IoRegistries<T> {
    registries: [AssociationRegistry<T>; 5],
    sweep_interval: usize,
    since_sweep: AtomicUsize,
}

impl<T> IoRegistries<T> {
    /// `sweep_interval` is the number of associations between sweeps.
    pub fn new(sweep_interval: usize) -> Self {
        Self {
            registries: IoKind::ALL.map(AssociationRegistry::new),
            sweep_interval: sweep_interval.max(1),
            since_sweep: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self, kind: IoKind) -> &AssociationRegistry<T> {
        &self.registries[kind.index()]
    }

    /// Associate and, every `sweep_interval` calls, sweep all kinds.
    ///
    /// Returns whether the association was new and how many dead entries a
    /// sweep removed (zero when no sweep ran).
    pub fn associate(&self, io: &IoHandle, value: Arc<T>) -> (bool, usize) {
        let added = self.registry(io.kind()).associate(io, value);
        let count = self.since_sweep.fetch_add(1, Ordering::Relaxed) + 1;
        let evicted = if count % self.sweep_interval == 0 {
            self.sweep()
        } else {
            0
        };
        (added, evicted)
    }

    pub fn lookup(&self, io: &IoHandle) -> Option<Arc<T>> {
        self.registry(io.kind()).lookup(io)
    }

    pub fn dissociate(&self, io: &IoHandle) -> Option<Arc<T>> {
        self.registry(io.kind()).dissociate(io)
    }

    pub fn sweep(&self) -> usize {
        self.registries.iter().map(AssociationRegistry::sweep).sum()
    }

    /// Total entries across all kinds.
    pub fn len(&self) -> usize {
        self.registries.iter().map(AssociationRegistry::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
