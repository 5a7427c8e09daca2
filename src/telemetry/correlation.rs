// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Capture identifiers for log correlation.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Identifies one capture context in log lines (the `capture` field).
///
/// Progress, completion and finalization of one body usually happen on
/// different threads; grepping for the id ties them back together.
/// `{}` prints the eight-digit short form, `{:#}` the full UUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CaptureId(Uuid);

impl CaptureId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex digits.
    pub fn short(&self) -> String {
        let mut simple = self.0.simple().to_string();
        simple.truncate(8);
        simple
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}", self.0)
        } else {
            f.write_str(&self.short())
        }
    }
}

impl fmt::Debug for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> CaptureId {
        CaptureId(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap())
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(CaptureId::new(), CaptureId::new());
    }

    #[test]
    fn test_display_forms() {
        let id = fixed();
        assert_eq!(id.to_string(), "550e8400");
        assert_eq!(format!("{:#}", id), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(format!("{:?}", id), "CaptureId(550e8400-e29b-41d4-a716-446655440000)");
    }

    #[test]
    fn test_serializes_full_uuid() {
        let json = serde_json::to_string(&fixed()).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
    }
}
