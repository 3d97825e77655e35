//! Weekly capacity ledger.
//!
//! # Weekly capacity
//! Per part of day: the sum of researcher availability for that part minus
//! the configured spare reserve. Flex days form one shared pool that covers
//! a part's shortfall.
//!
//! # Boundary days
//! A visit whose window starts or ends inside the week only covers days
//! `C = [max(from, Mon), min(to, Fri)]`. Besides the weekly check, all
//! accepted boundary visits of the same part lying inside `C` must fit
//!
//! ```text
//! cap(C) = Σ_{d ∈ C} w(d) · h(part)     w(d) = 1 on a boundary day, else 2
//! ```
//!
//! where `h(part)` counts researchers who can work the part at all.

use serde::{Deserialize, Serialize};

use super::week::Week;
use super::SkipReason;
use crate::config::SpareCapacity;
use crate::models::{PartOfDay, Researcher, Visit};

/// Researcher-days left per part after selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingCapacity {
    pub morning: i64,
    pub daytime: i64,
    pub evening: i64,
    pub flex: i64,
}

/// Days of the week a visit covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    /// First covered workday (0 = Monday).
    pub first: usize,
    /// Last covered workday.
    pub last: usize,
    /// The window starts inside the week.
    pub starts_inside: bool,
    /// The window ends inside the week.
    pub ends_inside: bool,
}

impl Coverage {
    /// Coverage of `visit` in `week`, `None` when it misses the week.
    pub fn of(visit: &Visit, week: &Week) -> Option<Self> {
        let window = visit.window().intersect(&week.window())?;
        Some(Self {
            first: week.day_index(window.from)?,
            last: week.day_index(window.to)?,
            starts_inside: visit.from_date > week.monday(),
            ends_inside: visit.to_date < week.friday(),
        })
    }

    /// Whether the visit is available the whole week.
    pub fn spans_week(&self) -> bool {
        !self.starts_inside && !self.ends_inside
    }

    /// Whether `other` lies within these days.
    pub fn contains(&self, other: &Coverage) -> bool {
        other.first >= self.first && other.last <= self.last
    }

    /// Sum of day weights: 1 on a boundary day, 2 otherwise.
    pub fn weight(&self) -> i64 {
        (self.first..=self.last)
            .map(|day| {
                let boundary = (self.starts_inside && day == self.first)
                    || (self.ends_inside && day == self.last);
                if boundary {
                    1
                } else {
                    2
                }
            })
            .sum()
    }
}

/// Capacity held by one accepted visit, see [`CapacityLedger::take`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub part: PartOfDay,
    from_part: i64,
    from_flex: i64,
    boundary: Option<Coverage>,
}

impl Reservation {
    /// Researcher-days held.
    pub fn units(&self) -> i64 {
        self.from_part + self.from_flex
    }
}

#[derive(Debug, Clone)]
struct BoundaryUse {
    part: PartOfDay,
    coverage: Coverage,
    units: i64,
}

/// Tracks remaining capacity while visits are accepted.
#[derive(Debug, Clone)]
pub struct CapacityLedger {
    week: Week,
    /// Morning, Daytime, Evening.
    remaining: [i64; 3],
    flex: i64,
    headcount: [i64; 3],
    boundary: Vec<BoundaryUse>,
}

fn slot(part: PartOfDay) -> usize {
    match part {
        PartOfDay::Morning => 0,
        PartOfDay::Daytime => 1,
        PartOfDay::Evening => 2,
    }
}

impl CapacityLedger {
    /// Opens the ledger for `week` from the researcher pool.
    pub fn new(week: Week, researchers: &[Researcher], spare: &SpareCapacity) -> Self {
        let mut remaining = [0i64; 3];
        let mut headcount = [0i64; 3];
        for part in PartOfDay::PREFERENCE {
            let i = slot(part);
            let total: i64 = researchers
                .iter()
                .map(|r| i64::from(r.availability.for_part(part)))
                .sum();
            remaining[i] = total - i64::from(spare.for_part(part));
            headcount[i] = researchers.iter().filter(|r| r.can_work(part)).count() as i64;
        }
        let flex = researchers
            .iter()
            .map(|r| i64::from(r.availability.flex))
            .sum();

        Self {
            week,
            remaining,
            flex,
            headcount,
            boundary: Vec::new(),
        }
    }

    pub fn week(&self) -> &Week {
        &self.week
    }

    /// Remaining dedicated capacity for `part` (may be negative after the reserve).
    pub fn remaining(&self, part: PartOfDay) -> i64 {
        self.remaining[slot(part)]
    }

    /// Remaining shared flex days.
    pub fn flex(&self) -> i64 {
        self.flex
    }

    /// Capacity of the covered days for `part`.
    pub fn boundary_capacity(&self, part: PartOfDay, coverage: &Coverage) -> i64 {
        coverage.weight() * self.headcount[slot(part)]
    }

    /// Checks `visit` against both capacity rules without reserving.
    pub fn check(&self, visit: &Visit) -> Result<(PartOfDay, Coverage), SkipReason> {
        let part = visit.part_of_day.ok_or(SkipReason::UnknownPartOfDay)?;
        let coverage = Coverage::of(visit, &self.week).ok_or(SkipReason::OutsideWeek)?;
        let units = i64::from(visit.required_researchers);

        if units > self.remaining(part).max(0) + self.flex {
            return Err(SkipReason::CapacityExhausted);
        }
        if !coverage.spans_week() {
            let used: i64 = self
                .boundary
                .iter()
                .filter(|b| b.part == part && coverage.contains(&b.coverage))
                .map(|b| b.units)
                .sum();
            if used + units > self.boundary_capacity(part, &coverage) {
                return Err(SkipReason::BoundaryDaysExhausted);
            }
        }
        Ok((part, coverage))
    }

    /// Reserves capacity for `visit`, dedicated part first, then flex.
    pub fn reserve(&mut self, visit: &Visit) -> Result<PartOfDay, SkipReason> {
        self.take(visit).map(|r| r.part)
    }

    /// Like [`reserve`](Self::reserve), returning what was taken so it can
    /// be given back with [`release`](Self::release).
    pub fn take(&mut self, visit: &Visit) -> Result<Reservation, SkipReason> {
        let (part, coverage) = self.check(visit)?;
        let units = i64::from(visit.required_researchers);

        let i = slot(part);
        let from_part = units.min(self.remaining[i].max(0));
        self.remaining[i] -= from_part;
        self.flex -= units - from_part;

        let boundary = (!coverage.spans_week()).then_some(coverage);
        if boundary.is_some() {
            self.boundary.push(BoundaryUse {
                part,
                coverage,
                units,
            });
        }
        Ok(Reservation {
            part,
            from_part,
            from_flex: units - from_part,
            boundary,
        })
    }

    /// Returns the capacity held by `reservation`.
    pub fn release(&mut self, reservation: Reservation) {
        self.remaining[slot(reservation.part)] += reservation.from_part;
        self.flex += reservation.from_flex;
        if let Some(coverage) = reservation.boundary {
            let held = self.boundary.iter().rposition(|b| {
                b.part == reservation.part
                    && b.coverage == coverage
                    && b.units == reservation.units()
            });
            if let Some(pos) = held {
                self.boundary.remove(pos);
            }
        }
    }

    /// Snapshot of what is left.
    pub fn snapshot(&self) -> RemainingCapacity {
        RemainingCapacity {
            morning: self.remaining[slot(PartOfDay::Morning)],
            daytime: self.remaining[slot(PartOfDay::Daytime)],
            evening: self.remaining[slot(PartOfDay::Evening)],
            flex: self.flex,
        }
    }
}
