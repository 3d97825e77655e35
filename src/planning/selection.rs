//! Weekly visit selection under capacity.
//!
//! # Algorithm
//!
//! 1. Keep visits whose window touches the week (`from <= Fri`, `to >= Mon`).
//! 2. Build an eight-bit priority weight, most significant first:
//!
//!    | Bit | Flag |
//!    |-----|------|
//!    | 7 | `priority` set |
//!    | 6 | window ends within 14 days of Monday |
//!    | 5 | first species' family priority <= 3 |
//!    | 4 | first function is an SMP function |
//!    | 3 | a flight-route or foraging-area function |
//!    | 2 | hub |
//!    | 1 | sleutel |
//!    | 0 | fiets, dvp or wbc |
//!
//! 3. Stable-sort by weight, highest first, so visits sharing their top
//!    flag are ordered by the lower ones.
//! 4. Accept in that order while the [`CapacityLedger`] allows.
//!
//! Equal weights keep the caller's order.

use std::cmp::Reverse;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::capacity::{CapacityLedger, RemainingCapacity};
use super::week::Week;
use super::SkipReason;
use crate::config::SpareCapacity;
use crate::models::{PartOfDay, Researcher, Visit, VisitId};

/// Days after Monday within which an ending window is urgent.
pub const URGENT_WITHIN_DAYS: i64 = 14;

/// Family priority at or below which a visit is planned early.
pub const HIGH_FAMILY_PRIORITY: i32 = 3;

/// Whether `visit` can be done in `week` at all.
pub fn is_eligible(visit: &Visit, week: &Week) -> bool {
    visit.from_date <= week.friday() && visit.to_date >= week.monday()
}

/// Priority weight of `visit` in `week`; higher is planned first.
pub fn priority_weight(visit: &Visit, week: &Week) -> u8 {
    let r = &visit.requirements;
    [
        visit.priority,
        visit.to_date <= week.monday() + Duration::days(URGENT_WITHIN_DAYS),
        visit
            .family_priority()
            .is_some_and(|p| p <= HIGH_FAMILY_PRIORITY),
        visit.is_smp(),
        visit.has_route_or_foraging_function(),
        r.hub,
        r.sleutel,
        visit.needs_transport_or_certificate(),
    ]
    .into_iter()
    .fold(0, |weight, flag| (weight << 1) | u8::from(flag))
}

/// Priority tier of `visit`: position of its most significant flag
/// (0 = `priority`, 8 = no flag set).
pub fn priority_tier(visit: &Visit, week: &Week) -> u8 {
    priority_weight(visit, week).leading_zeros() as u8
}

/// Indices of eligible visits in selection order.
pub fn selection_order(visits: &[Visit], week: &Week) -> Vec<usize> {
    let mut order: Vec<usize> = (0..visits.len())
        .filter(|&i| is_eligible(&visits[i], week))
        .collect();
    order.sort_by_key(|&i| Reverse(priority_weight(&visits[i], week)));
    order
}

/// A visit accepted for the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedVisit {
    /// Position in the input slice.
    pub index: usize,
    pub visit_id: Option<VisitId>,
    pub part_of_day: PartOfDay,
    pub tier: u8,
}

/// A visit left out of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedVisit {
    /// Position in the input slice.
    pub index: usize,
    pub visit_id: Option<VisitId>,
    pub reason: SkipReason,
}

/// Result of visit selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSelection {
    /// Accepted visits in priority order.
    pub selected: Vec<SelectedVisit>,
    /// Eligible visits that did not fit.
    pub skipped: Vec<SkippedVisit>,
    /// Capacity left after selection.
    pub remaining: RemainingCapacity,
}

impl WeekSelection {
    /// Input indices of the accepted visits.
    pub fn indices(&self) -> Vec<usize> {
        self.selected.iter().map(|s| s.index).collect()
    }
}

/// Selects the visits to staff in `week`.
pub fn select(
    week: &Week,
    visits: &[Visit],
    researchers: &[Researcher],
    spare: &SpareCapacity,
) -> WeekSelection {
    let mut ledger = CapacityLedger::new(*week, researchers, spare);
    let mut selection = WeekSelection::default();

    for index in selection_order(visits, week) {
        let visit = &visits[index];
        match ledger.reserve(visit) {
            Ok(part_of_day) => selection.selected.push(SelectedVisit {
                index,
                visit_id: visit.id,
                part_of_day,
                tier: priority_tier(visit, week),
            }),
            Err(reason) => selection.skipped.push(SkippedVisit {
                index,
                visit_id: visit.id,
                reason,
            }),
        }
    }

    selection.remaining = ledger.snapshot();
    selection
}
