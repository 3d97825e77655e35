//! Researcher scoring.
//!
//! Each qualified researcher gets five normalized terms in `[0, 1]`:
//!
//! | Term | Definition |
//! |------|-----------|
//! | travel | 15-minute band (1, 2, 3, 4, 6) / 6; 75+ minutes excludes |
//! | workload | assigned visits / weekly availability (1.0 when none) |
//! | large team | own large-team visits / all large-team visits |
//! | bike | own bike visits / all bike visits |
//! | project | own visits of this project / all visits of this project |
//!
//! The score is the weighted sum (default weights 4, 32, 3, 1, 1).
//! Lower wins; ties keep the input order.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::travel::TravelTimeSource;
use crate::config::ScoreWeights;
use crate::models::{Researcher, ResearcherId, ResearcherLoad, Visit};

/// Travel time (minutes) at which a researcher is excluded.
pub const TRAVEL_EXCLUSION_MINUTES: u32 = 75;

/// Highest travel band, used for normalization.
const MAX_TRAVEL_BAND: f64 = 6.0;

/// Travel band for `minutes`, `None` when excluded.
pub fn travel_band(minutes: u32) -> Option<u32> {
    match minutes {
        0..=15 => Some(1),
        16..=30 => Some(2),
        31..=45 => Some(3),
        46..=60 => Some(4),
        m if m < TRAVEL_EXCLUSION_MINUTES => Some(6),
        _ => None,
    }
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole)
    }
}

/// Week-wide denominators of the ratio terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTotals {
    /// Planned visits needing more than two researchers.
    pub large_team: u32,
    /// Planned bike visits.
    pub fiets: u32,
    /// Planned visits per project.
    pub by_project: HashMap<u32, u32>,
}

impl PlanTotals {
    /// Totals over the planned visits.
    pub fn from_visits<'a>(visits: impl IntoIterator<Item = &'a Visit>) -> Self {
        let mut totals = Self::default();
        for v in visits {
            if v.is_large_team() {
                totals.large_team += 1;
            }
            if v.requirements.fiets {
                totals.fiets += 1;
            }
            if let Some(project) = v.project_id {
                *totals.by_project.entry(project).or_default() += 1;
            }
        }
        totals
    }
}

/// The five score terms and their weighted sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub travel: f64,
    pub workload: f64,
    pub large_team: f64,
    pub bike: f64,
    pub project: f64,
    pub total: f64,
}

/// A ranked candidate for one visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub researcher_id: ResearcherId,
    pub score: ScoreBreakdown,
}

/// Weighted multi-criteria researcher scorer.
#[derive(Clone)]
pub struct ResearcherScorer {
    weights: ScoreWeights,
    travel: Option<Arc<dyn TravelTimeSource>>,
}

impl std::fmt::Debug for ResearcherScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearcherScorer")
            .field("weights", &self.weights)
            .field("travel", &self.travel.is_some())
            .finish()
    }
}

impl ResearcherScorer {
    /// Scorer without travel times (travel term 0).
    pub fn new(weights: ScoreWeights) -> Self {
        Self {
            weights,
            travel: None,
        }
    }

    /// Uses `source` for the travel term.
    pub fn with_travel_times(mut self, source: Arc<dyn TravelTimeSource>) -> Self {
        self.travel = Some(source);
        self
    }

    /// Normalized travel term, `None` when the researcher is too far away.
    ///
    /// Missing locations or an unknown route contribute 0.
    pub fn travel_term(&self, researcher: &Researcher, visit: &Visit) -> Option<f64> {
        let minutes = match (&self.travel, &researcher.location, &visit.location) {
            (Some(source), Some(origin), Some(destination)) => source.minutes(origin, destination),
            _ => None,
        };
        match minutes {
            Some(m) => travel_band(m).map(|band| f64::from(band) / MAX_TRAVEL_BAND),
            None => Some(0.0),
        }
    }

    /// Scores one researcher, `None` when excluded by travel time.
    pub fn score(
        &self,
        researcher: &Researcher,
        visit: &Visit,
        load: &ResearcherLoad,
        totals: &PlanTotals,
    ) -> Option<ScoreBreakdown> {
        let travel = self.travel_term(researcher, visit)?;

        let capacity = researcher.availability.total();
        let workload = if capacity == 0 {
            1.0
        } else {
            ratio(load.assigned_visits, capacity)
        };
        let large_team = ratio(load.assigned_large_team, totals.large_team);
        let bike = ratio(load.assigned_fiets, totals.fiets);
        let project = visit.project_id.map_or(0.0, |p| {
            ratio(
                load.for_project(p),
                totals.by_project.get(&p).copied().unwrap_or(0),
            )
        });

        let w = &self.weights;
        let total = w.travel * travel
            + w.workload * workload
            + w.large_team * large_team
            + w.bike * bike
            + w.project * project;

        Some(ScoreBreakdown {
            travel,
            workload,
            large_team,
            bike,
            project,
            total,
        })
    }

    /// Scores and sorts `researchers`, lowest first; excluded ones are dropped.
    pub fn rank<'r>(
        &self,
        researchers: impl IntoIterator<Item = &'r Researcher>,
        visit: &Visit,
        loads: &HashMap<ResearcherId, ResearcherLoad>,
        totals: &PlanTotals,
    ) -> Vec<Candidate> {
        let empty = ResearcherLoad::default();
        let mut ranked: Vec<Candidate> = researchers
            .into_iter()
            .filter_map(|r| {
                let load = loads.get(&r.id).unwrap_or(&empty);
                self.score(r, visit, load, totals).map(|score| Candidate {
                    researcher_id: r.id,
                    score,
                })
            })
            .collect();
        ranked.sort_by(|a, b| a.score.total.total_cmp(&b.score.total));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeeklyAvailability;
    use crate::planning::travel::StaticTravelTimes;
    use chrono::NaiveDate;

    fn visit() -> Visit {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        Visit::new(d(1), d(30)).with_location("Site")
    }

    fn researcher(id: ResearcherId, home: &str) -> Researcher {
        Researcher::new(id, format!("R{id}"))
            .with_location(home)
            .with_availability(WeeklyAvailability::new(2, 0, 3, 0))
    }

    fn scorer() -> ResearcherScorer {
        let times = StaticTravelTimes::new()
            .with("Near", "Site", 10)
            .with("Mid", "Site", 50)
            .with("Far", "Site", 80);
        ResearcherScorer::new(ScoreWeights::default()).with_travel_times(Arc::new(times))
    }

    #[test]
    fn test_travel_bands() {
        assert_eq!(travel_band(0), Some(1));
        assert_eq!(travel_band(15), Some(1));
        assert_eq!(travel_band(16), Some(2));
        assert_eq!(travel_band(45), Some(3));
        assert_eq!(travel_band(60), Some(4));
        assert_eq!(travel_band(74), Some(6));
        assert_eq!(travel_band(75), None);
    }

    #[test]
    fn test_closer_researcher_ranks_first() {
        let pool = vec![researcher(1, "Mid"), researcher(2, "Near")];
        let ranked = scorer().rank(&pool, &visit(), &HashMap::new(), &PlanTotals::default());

        assert_eq!(ranked[0].researcher_id, 2);
        assert!((ranked[0].score.travel - 1.0 / 6.0).abs() < 1e-9);
        assert!((ranked[1].score.travel - 4.0 / 6.0).abs() < 1e-9);
        assert!((ranked[0].score.total - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_far_researcher_excluded() {
        let pool = vec![researcher(1, "Far")];
        let ranked = scorer().rank(&pool, &visit(), &HashMap::new(), &PlanTotals::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_unknown_route_is_neutral() {
        let r = researcher(1, "Elsewhere");
        let term = scorer().travel_term(&r, &visit());
        assert_eq!(term, Some(0.0));
    }

    #[test]
    fn test_workload_dominates() {
        let pool = vec![researcher(1, "Near"), researcher(2, "Mid")];
        let loads: HashMap<ResearcherId, ResearcherLoad> = [(
            1,
            ResearcherLoad {
                assigned_visits: 3,
                ..ResearcherLoad::default()
            },
        )]
        .into_iter()
        .collect();
        let ranked = scorer().rank(&pool, &visit(), &loads, &PlanTotals::default());
        // 32 * 3/5 outweighs the travel difference
        assert_eq!(ranked[0].researcher_id, 2);
    }

    #[test]
    fn test_zero_capacity_counts_as_full() {
        let r = Researcher::new(1, "Idle");
        let s = scorer()
            .score(&r, &visit(), &ResearcherLoad::default(), &PlanTotals::default())
            .unwrap();
        assert!((s.workload - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratios_and_ties_keep_order() {
        let v = visit().with_project(7);
        let totals = PlanTotals::from_visits([&v]);
        assert_eq!(totals.by_project.get(&7), Some(&1));

        let pool = vec![researcher(1, "Near"), researcher(2, "Near")];
        let ranked = scorer().rank(&pool, &v, &HashMap::new(), &totals);
        assert_eq!(
            ranked.iter().map(|c| c.researcher_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }
}
