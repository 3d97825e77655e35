//! Planning week (Monday..Friday).

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::models::DateWindow;

/// Working days in a planning week.
pub const WORKDAYS: usize = 5;

/// A working week, Monday through Friday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Week {
    monday: NaiveDate,
}

impl Week {
    /// The week starting on `monday`.
    ///
    /// # Errors
    /// [`PlannerError::InvalidWeekStart`] when `monday` is not a Monday.
    pub fn starting(monday: NaiveDate) -> Result<Self> {
        if monday.weekday() != Weekday::Mon {
            return Err(PlannerError::InvalidWeekStart(monday));
        }
        Ok(Self { monday })
    }

    /// The week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        Self {
            monday: date - Duration::days(offset),
        }
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn friday(&self) -> NaiveDate {
        self.monday + Duration::days(4)
    }

    /// Monday..Friday in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let monday = self.monday;
        (0..WORKDAYS as i64).map(move |i| monday + Duration::days(i))
    }

    /// The week as a date window.
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.monday, self.friday())
    }

    /// Zero-based workday index of `date`, if it falls in the week.
    pub fn day_index(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.monday).num_days();
        (0..WORKDAYS as i64)
            .contains(&offset)
            .then_some(offset as usize)
    }
}
