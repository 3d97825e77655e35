//! Date windows and year shifting.
//!
//! Protocol windows are authored against a reference year and carry only
//! month/day meaning. [`DateWindow::shift_to_year`] moves them onto the
//! scheduling year before any comparison happens.
//!
//! # Interval Model
//! Closed interval `[from, to]` on calendar dates. The *span* of a window is
//! `to - from` in days, so a window from 15 May to 15 July spans 61 days.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A closed date interval `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day (inclusive).
    pub from: NaiveDate,
    /// Last day (inclusive).
    pub to: NaiveDate,
}

impl DateWindow {
    /// Creates a window. No ordering check; see [`is_valid`](Self::is_valid).
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Whether `from <= to`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    /// Span in days (`to - from`). Negative for inverted windows.
    #[inline]
    pub fn span_days(&self) -> i64 {
        (self.to - self.from).num_days()
    }

    /// Whether a date falls inside the window.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Intersection of two windows, `None` if they are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to);
        (from <= to).then_some(Self { from, to })
    }

    /// Overlap span in days; zero or negative when disjoint.
    pub fn overlap_days(&self, other: &Self) -> i64 {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to);
        (to - from).num_days()
    }

    /// Window with `from` moved forward to at least `earliest`.
    pub fn starting_no_earlier_than(&self, earliest: NaiveDate) -> Self {
        Self {
            from: self.from.max(earliest),
            to: self.to,
        }
    }

    /// Same month/day on `year`.
    pub fn shift_to_year(&self, year: i32) -> Self {
        Self {
            from: shift_date_to_year(self.from, year),
            to: shift_date_to_year(self.to, year),
        }
    }
}

/// Moves a date onto `year`, keeping month and day.
///
/// 29 February becomes 28 February in non-leap years.
pub fn shift_date_to_year(date: NaiveDate, year: i32) -> NaiveDate {
    date.with_year(year).unwrap_or_else(|| {
        // Only Feb 29 can fail; the day before always exists.
        (date - Duration::days(1))
            .with_year(year)
            .unwrap_or(date)
    })
}
