//! Input validation for protocol sets.
//!
//! Checks structural integrity of protocols before visit generation.
//! Detects:
//! - Duplicate protocol IDs
//! - Protocols without any visit window
//! - Inverted windows (`from > to`)
//! - Two windows claiming the same visit index
//! - A required visit count that differs from the number of required windows
//!
//! None of these abort generation. Each problem becomes a
//! [`GenerationWarning`] attributed to the offending protocol; generation
//! places whatever occurrences it still can.

use crate::models::{Protocol, ProtocolId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A data-quality warning raised while generating visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationWarning {
    /// Warning category.
    pub kind: WarningKind,
    /// Protocol the warning is about, if any.
    pub protocol_id: Option<ProtocolId>,
    /// Human-readable description.
    pub message: String,
}

/// Categories of generation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// Two protocols share the same ID.
    DuplicateProtocolId,
    /// A protocol has no windows at all.
    NoWindows,
    /// A window ends before it starts.
    InvalidWindowRange,
    /// Two windows of one protocol share a visit index.
    DuplicateVisitIndex,
    /// `visits` differs from the number of required windows.
    WindowCountMismatch,
    /// Fewer occurrences were placed than the protocol requires.
    MissingOccurrence,
    /// A protocol needing both a morning and an evening visit got only one part.
    UnsatisfiedDayPart,
    /// An occurrence could not honor the minimum gap inside its window.
    UnplaceableWindow,
}

impl GenerationWarning {
    /// Creates a warning attributed to a protocol.
    pub fn new(kind: WarningKind, protocol_id: ProtocolId, message: impl Into<String>) -> Self {
        Self {
            kind,
            protocol_id: Some(protocol_id),
            message: message.into(),
        }
    }
}

impl fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol_id {
            Some(id) => write!(f, "[{:?}] protocol {}: {}", self.kind, id, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

/// Validates a protocol set.
///
/// Checks:
/// 1. No duplicate protocol IDs
/// 2. Every protocol has at least one window
/// 3. Every window has `from <= to`
/// 4. No two windows of a protocol share a visit index
/// 5. An explicit `visits` count matches the number of required windows
///
/// # Returns
/// All detected issues, in protocol order. Empty when the input is clean.
pub fn validate_protocols(protocols: &[Protocol]) -> Vec<GenerationWarning> {
    let mut warnings = Vec::new();

    let mut ids = HashSet::new();
    for p in protocols {
        if !ids.insert(p.id) {
            warnings.push(GenerationWarning::new(
                WarningKind::DuplicateProtocolId,
                p.id,
                format!("Duplicate protocol ID: {}", p.id),
            ));
        }
    }

    for p in protocols {
        if p.windows.is_empty() {
            warnings.push(GenerationWarning::new(
                WarningKind::NoWindows,
                p.id,
                format!(
                    "Protocol '{} / {}' has no visit windows",
                    p.species.name, p.function.name
                ),
            ));
            continue;
        }

        let mut indices = HashSet::new();
        for w in &p.windows {
            if !w.window.is_valid() {
                warnings.push(GenerationWarning::new(
                    WarningKind::InvalidWindowRange,
                    p.id,
                    format!(
                        "Window {} ends before it starts ({} > {})",
                        w.visit_index, w.window.from, w.window.to
                    ),
                ));
            }
            if !indices.insert(w.visit_index) {
                warnings.push(GenerationWarning::new(
                    WarningKind::DuplicateVisitIndex,
                    p.id,
                    format!("Visit index {} appears more than once", w.visit_index),
                ));
            }
        }

        let required_windows = p.windows.iter().filter(|w| w.required).count();
        if let Some(visits) = p.visits {
            if visits as usize != required_windows {
                warnings.push(GenerationWarning::new(
                    WarningKind::WindowCountMismatch,
                    p.id,
                    format!("Protocol requires {visits} visits but has {required_windows} required windows"),
                ));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Family, Function, ProtocolVisitWindow, Species};
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn protocol(id: ProtocolId) -> Protocol {
        Protocol::new(
            id,
            Species::new(1, "Gewone dwergvleermuis", Family::new(1, "Vleermuis")),
            Function::new(1, "Kraamverblijfplaats"),
        )
    }

    fn kinds(warnings: &[GenerationWarning]) -> Vec<WarningKind> {
        warnings.iter().map(|w| w.kind).collect()
    }

    #[test]
    fn test_valid_input() {
        let protocols = vec![
            protocol(1)
                .with_visits(2)
                .with_window(d(5, 15), d(6, 15))
                .with_window(d(6, 15), d(7, 15)),
            protocol(2).with_window(d(4, 15), d(8, 15)),
        ];
        assert!(validate_protocols(&protocols).is_empty());
    }

    #[test]
    fn test_duplicate_protocol_id() {
        let protocols = vec![
            protocol(1).with_window(d(5, 1), d(6, 1)),
            protocol(1).with_window(d(5, 1), d(6, 1)),
        ];
        let warnings = validate_protocols(&protocols);
        assert_eq!(kinds(&warnings), vec![WarningKind::DuplicateProtocolId]);
    }

    #[test]
    fn test_no_windows() {
        let warnings = validate_protocols(&[protocol(7).with_visits(2)]);
        assert_eq!(kinds(&warnings), vec![WarningKind::NoWindows]);
        assert_eq!(warnings[0].protocol_id, Some(7));
    }

    #[test]
    fn test_inverted_window() {
        let warnings = validate_protocols(&[protocol(1).with_window(d(7, 1), d(6, 1))]);
        assert_eq!(kinds(&warnings), vec![WarningKind::InvalidWindowRange]);
    }

    #[test]
    fn test_duplicate_visit_index() {
        let p = protocol(1)
            .with_visit_window(ProtocolVisitWindow::new(1, d(5, 1), d(6, 1)))
            .with_visit_window(ProtocolVisitWindow::new(1, d(6, 1), d(7, 1)));
        let warnings = validate_protocols(&[p]);
        assert_eq!(kinds(&warnings), vec![WarningKind::DuplicateVisitIndex]);
    }

    #[test]
    fn test_window_count_mismatch_ignores_optional() {
        let p = protocol(1)
            .with_visits(2)
            .with_window(d(5, 1), d(6, 1))
            .with_visit_window(ProtocolVisitWindow::new(2, d(6, 1), d(7, 1)).optional());
        let warnings = validate_protocols(&[p]);
        assert_eq!(kinds(&warnings), vec![WarningKind::WindowCountMismatch]);
        assert!(warnings[0].message.contains("requires 2 visits"));
    }

    #[test]
    fn test_multiple_warnings_and_display() {
        let protocols = vec![
            protocol(1),
            protocol(2).with_visits(3).with_window(d(7, 1), d(6, 1)),
        ];
        let warnings = validate_protocols(&protocols);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].to_string().starts_with("[NoWindows] protocol 1"));
    }
}
