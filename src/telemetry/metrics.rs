// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Capture counters.
//!
//! Lightweight atomic counters owned by each engine instance. Hosts that
//! export metrics read them through [`CaptureMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters for one capture engine.
#[derive(Debug)]
pub struct CaptureMetrics {
    contexts_created: AtomicU64,
    contexts_rejected: AtomicU64,
    units_accepted: AtomicU64,
    units_dropped: AtomicU64,
    finalized: AtomicU64,
    fallback_spans: AtomicU64,
    suppressed_failures: AtomicU64,
    evicted: AtomicU64,
    start_time: Instant,
}

impl CaptureMetrics {
    /// Create a new, zeroed set of counters.
    pub fn new() -> Self {
        Self {
            contexts_created: AtomicU64::new(0),
            contexts_rejected: AtomicU64::new(0),
            units_accepted: AtomicU64::new(0),
            units_dropped: AtomicU64::new(0),
            finalized: AtomicU64::new(0),
            fallback_spans: AtomicU64::new(0),
            suppressed_failures: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_context_created(&self) {
        self.contexts_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_context_rejected(&self) {
        self.contexts_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one buffer write: `accepted` units stored, `dropped` truncated.
    pub fn record_write(&self, accepted: usize, dropped: usize) {
        self.units_accepted
            .fetch_add(accepted as u64, Ordering::Relaxed);
        if dropped > 0 {
            self.units_dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        }
    }

    pub fn record_finalized(&self, fallback: bool) {
        self.finalized.fetch_add(1, Ordering::Relaxed);
        if fallback {
            self.fallback_spans.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_suppressed_failure(&self) {
        self.suppressed_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get uptime since the counters were created.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            contexts_created: self.contexts_created.load(Ordering::Relaxed),
            contexts_rejected: self.contexts_rejected.load(Ordering::Relaxed),
            units_accepted: self.units_accepted.load(Ordering::Relaxed),
            units_dropped: self.units_dropped.load(Ordering::Relaxed),
            finalized: self.finalized.load(Ordering::Relaxed),
            fallback_spans: self.fallback_spans.load(Ordering::Relaxed),
            suppressed_failures: self.suppressed_failures.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            uptime: self.uptime(),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.contexts_created,
            &self.contexts_rejected,
            &self.units_accepted,
            &self.units_dropped,
            &self.finalized,
            &self.fallback_spans,
            &self.suppressed_failures,
            &self.evicted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of capture counters at a point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Contexts that passed the content gate.
    pub contexts_created: u64,

    /// Contexts refused by the content gate or configuration.
    pub contexts_rejected: u64,

    /// Bytes or chars stored in buffers.
    pub units_accepted: u64,

    /// Bytes or chars dropped by truncation.
    pub units_dropped: u64,

    /// Successful finalizations (compare-and-set winners).
    pub finalized: u64,

    /// Finalizations that went to a fallback child span.
    pub fallback_spans: u64,

    /// Errors and panics swallowed at the engine boundary.
    pub suppressed_failures: u64,

    /// Registry entries removed because their I/O object was gone.
    pub evicted: u64,

    /// Uptime when snapshot was taken.
    #[serde(skip)]
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Body Capture Report ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n", self.uptime));
        report.push_str(&format!(
            "Contexts: {} created, {} rejected\n",
            self.contexts_created, self.contexts_rejected
        ));
        report.push_str(&format!(
            "Data: {} accepted, {} dropped\n",
            self.units_accepted, self.units_dropped
        ));
        report.push_str(&format!(
            "Finalized: {} ({} via fallback span)\n",
            self.finalized, self.fallback_spans
        ));
        if self.suppressed_failures > 0 {
            report.push_str(&format!(
                "Suppressed failures: {}\n",
                self.suppressed_failures
            ));
        }
        report.push_str(&format!("Evicted entries: {}\n", self.evicted));

        report
    }
}
