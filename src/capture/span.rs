// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The span abstraction the engine writes captured bodies to.
//!
//! The tracing subsystem owns span lifetime; the engine only holds a
//! shared handle and asks whether it is still recording.

use std::fmt;
use std::sync::Arc;

/// A value written to a span attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Str(String),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A recorded unit of work that can receive key/value attributes.
#[cfg_attr(test, mockall::automock)]
pub trait TraceSpan: Send + Sync {
    /// Whether the span still accepts attributes.
    fn is_recording(&self) -> bool;

    /// Set an attribute on the span.
    fn set_attribute(&self, key: &'static str, value: AttributeValue);

    /// Start a child span parented on this span's context.
    ///
    /// Must work after this span has ended.
    fn start_child(&self) -> Arc<dyn TraceSpan>;

    /// End the span. Later attribute writes are not recorded.
    fn end(&self);
}

/// Shared handle to a span.
pub type SharedSpan = Arc<dyn TraceSpan>;
