//! Weekly visit planning engine.
//!
//! Given a Monday, a visit pool and a researcher pool, the planner
//!
//! 1. selects the visits to staff under part-of-day capacity
//!    ([`selection`], [`capacity`])
//! 2. filters qualified researchers per visit ([`qualification`])
//! 3. ranks them by weighted score ([`scoring`]) and proposes the best
//!    `required_researchers` of them, updating running loads so later
//!    visits see earlier proposals
//!
//! Nothing is committed: the caller persists the proposals it accepts.
//!
//! # Example
//! ```
//! use chrono::NaiveDate;
//! use std::collections::HashMap;
//! use survey_schedule::config::PlannerConfig;
//! use survey_schedule::models::{PartOfDay, Researcher, Visit, WeeklyAvailability};
//! use survey_schedule::planning::{Week, WeeklyPlanner};
//!
//! let week = Week::starting(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()).unwrap();
//! let visit = Visit::new(
//!     NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
//! )
//! .with_id(1)
//! .with_part_of_day(PartOfDay::Evening);
//! let researchers: Vec<Researcher> = (1..=2)
//!     .map(|id| {
//!         Researcher::new(id, format!("R{id}"))
//!             .with_availability(WeeklyAvailability::new(0, 0, 2, 0))
//!     })
//!     .collect();
//!
//! let planner = WeeklyPlanner::new(PlannerConfig::default());
//! let plan = planner.plan_week(&week, &[visit], &researchers, &HashMap::new());
//! assert_eq!(plan.plans[0].proposed, vec![1]);
//! ```

pub mod capacity;
pub mod qualification;
pub mod scoring;
pub mod selection;
pub mod travel;
mod week;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::models::{PartOfDay, Researcher, ResearcherId, ResearcherLoad, Visit, VisitId};

pub use capacity::{CapacityLedger, Coverage, RemainingCapacity, Reservation};
pub use qualification::qualifies;
pub use scoring::{Candidate, PlanTotals, ResearcherScorer, ScoreBreakdown};
pub use selection::{SelectedVisit, SkippedVisit, WeekSelection};
pub use travel::{StaticTravelTimes, TravelTimeCache, TravelTimeSource};
pub use week::Week;

/// Why a visit is not (fully) planned this week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// Weekly capacity for the part of day (flex included) is used up.
    CapacityExhausted,
    /// The covered days of a partial-week window are used up.
    BoundaryDaysExhausted,
    /// The visit has no part of day.
    UnknownPartOfDay,
    /// The visit window does not touch the week.
    OutsideWeek,
    /// Fewer qualified, available researchers than the team size.
    NoQualifiedResearcher,
    /// The preferred researcher has no capacity left.
    PreferredResearcherUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::CapacityExhausted => "capacity exhausted",
            SkipReason::BoundaryDaysExhausted => "boundary days exhausted",
            SkipReason::UnknownPartOfDay => "unknown part of day",
            SkipReason::OutsideWeek => "outside week",
            SkipReason::NoQualifiedResearcher => "no qualified researcher",
            SkipReason::PreferredResearcherUnavailable => "preferred researcher unavailable",
        };
        f.write_str(text)
    }
}

/// Planning result for one selected visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitPlan {
    /// Position in the input slice.
    pub index: usize,
    pub visit_id: Option<VisitId>,
    pub part_of_day: PartOfDay,
    /// Qualified researchers with capacity, best first.
    pub candidates: Vec<Candidate>,
    /// Proposed team; empty when it could not be filled.
    pub proposed: Vec<ResearcherId>,
}

/// Planning result for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub week: Week,
    /// Selected visits in priority order.
    pub plans: Vec<VisitPlan>,
    /// Visits not planned, with reasons.
    pub skipped: Vec<SkippedVisit>,
    /// Part-of-day capacity left after staffing.
    pub remaining: RemainingCapacity,
    /// Researcher loads including the proposals.
    pub loads: HashMap<ResearcherId, ResearcherLoad>,
}

impl WeekPlan {
    /// Plans with a complete proposed team.
    pub fn staffed(&self) -> impl Iterator<Item = &VisitPlan> {
        self.plans.iter().filter(|p| !p.proposed.is_empty())
    }
}

/// Days a researcher can still give this week.
#[derive(Debug, Clone, Copy)]
struct Budget {
    /// Morning, Daytime, Evening.
    parts: [u32; 3],
    flex: u32,
}

impl Budget {
    fn of(researcher: &Researcher) -> Self {
        let a = researcher.availability;
        Self {
            parts: [a.morning, a.daytime, a.evening],
            flex: a.flex,
        }
    }

    fn slot(part: PartOfDay) -> usize {
        match part {
            PartOfDay::Morning => 0,
            PartOfDay::Daytime => 1,
            PartOfDay::Evening => 2,
        }
    }

    fn has(&self, part: PartOfDay) -> bool {
        self.parts[Self::slot(part)] > 0 || self.flex > 0
    }

    fn take(&mut self, part: PartOfDay) {
        let days = &mut self.parts[Self::slot(part)];
        if *days > 0 {
            *days -= 1;
        } else {
            self.flex = self.flex.saturating_sub(1);
        }
    }
}

/// The weekly planning engine.
#[derive(Debug, Clone)]
pub struct WeeklyPlanner {
    config: PlannerConfig,
    scorer: ResearcherScorer,
}

impl WeeklyPlanner {
    /// Creates a planner without travel times.
    pub fn new(config: PlannerConfig) -> Self {
        let scorer = ResearcherScorer::new(config.score_weights);
        Self { config, scorer }
    }

    /// Uses `source` for the travel term of the score.
    pub fn with_travel_times(mut self, source: Arc<dyn TravelTimeSource>) -> Self {
        self.scorer = self.scorer.with_travel_times(source);
        self
    }

    pub fn scorer(&self) -> &ResearcherScorer {
        &self.scorer
    }

    /// Selects the visits to staff in `week`.
    pub fn select_visits(
        &self,
        week: &Week,
        visits: &[Visit],
        researchers: &[Researcher],
    ) -> WeekSelection {
        let selection =
            selection::select(week, visits, researchers, &self.config.spare_capacity);
        info!(
            week = %week.monday(),
            pool = visits.len(),
            selected = selection.selected.len(),
            skipped = selection.skipped.len(),
            "visit selection"
        );
        selection
    }

    /// Selects visits and proposes a ranked team for each.
    pub fn plan_week(
        &self,
        week: &Week,
        visits: &[Visit],
        researchers: &[Researcher],
        loads: &HashMap<ResearcherId, ResearcherLoad>,
    ) -> WeekPlan {
        let selection = self.select_visits(week, visits, researchers);
        let totals = PlanTotals::from_visits(selection.selected.iter().map(|s| &visits[s.index]));

        let mut loads = loads.clone();
        let mut budgets: HashMap<ResearcherId, Budget> =
            researchers.iter().map(|r| (r.id, Budget::of(r))).collect();
        // Capacity is held only by staffed visits; an unstaffed visit gives
        // its share back to the ones after it.
        let mut ledger = CapacityLedger::new(*week, researchers, &self.config.spare_capacity);
        let mut skipped = Vec::new();
        let mut plans = Vec::with_capacity(selection.selected.len());

        for index in selection::selection_order(visits, week) {
            let visit = &visits[index];
            let reservation = match ledger.take(visit) {
                Ok(reservation) => reservation,
                Err(reason) => {
                    skipped.push(SkippedVisit {
                        index,
                        visit_id: visit.id,
                        reason,
                    });
                    continue;
                }
            };
            let part = reservation.part;
            let needed = visit.required_researchers as usize;
            let available = |r: &&Researcher| budgets.get(&r.id).is_some_and(|b| b.has(part));

            let mut proposed = Vec::new();
            let mut reason = None;

            if let Some(preferred) = visit.preferred_researcher_id {
                match researchers.iter().find(|r| r.id == preferred).filter(available) {
                    Some(_) => proposed.push(preferred),
                    None => reason = Some(SkipReason::PreferredResearcherUnavailable),
                }
            }

            let candidates = self.scorer.rank(
                researchers
                    .iter()
                    .filter(available)
                    .filter(|r| Some(r.id) != visit.preferred_researcher_id)
                    .filter(|r| qualifies(r, visit)),
                visit,
                &loads,
                &totals,
            );

            if reason.is_none() {
                proposed.extend(
                    candidates
                        .iter()
                        .take(needed.saturating_sub(proposed.len()))
                        .map(|c| c.researcher_id),
                );
                if proposed.len() < needed {
                    reason = Some(SkipReason::NoQualifiedResearcher);
                }
            }

            match reason {
                Some(reason) => {
                    debug!(visit = ?visit.id, %reason, "visit not staffed");
                    ledger.release(reservation);
                    proposed.clear();
                    skipped.push(SkippedVisit {
                        index,
                        visit_id: visit.id,
                        reason,
                    });
                }
                None => {
                    for id in &proposed {
                        if let Some(b) = budgets.get_mut(id) {
                            b.take(part);
                        }
                        let load = loads.entry(*id).or_default();
                        load.assigned_visits += 1;
                        if visit.is_large_team() {
                            load.assigned_large_team += 1;
                        }
                        if visit.requirements.fiets {
                            load.assigned_fiets += 1;
                        }
                        if let Some(project) = visit.project_id {
                            *load.assigned_by_project.entry(project).or_default() += 1;
                        }
                    }
                    debug!(visit = ?visit.id, ?proposed, "visit staffed");
                }
            }

            plans.push(VisitPlan {
                index,
                visit_id: visit.id,
                part_of_day: part,
                candidates,
                proposed,
            });
        }

        info!(
            week = %week.monday(),
            planned = plans.iter().filter(|p| !p.proposed.is_empty()).count(),
            skipped = skipped.len(),
            "week planned"
        );

        WeekPlan {
            week: *week,
            plans,
            skipped,
            remaining: ledger.snapshot(),
            loads,
        }
    }
}
