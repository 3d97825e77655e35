//! Visit generation engine.
//!
//! Turns a set of survey protocols into the smallest practical set of
//! schedulable [`Visit`]s, merging compatible protocols under the
//! strictest-constraint-wins principle.
//!
//! # Pipeline
//!
//! 1. **Validation**: protocol integrity checks ([`validate_protocols`])
//! 2. **Expansion**: required windows to dated, part-constrained occurrences
//! 3. **Bucketing**: greedy, per visit index, tightest window first
//! 4. **Solo families**: one visit per occurrence, spaced by the family gap
//! 5. **Coalescing**: identical window and part, still a clique
//! 6. **Completion**: occurrences beyond the window count
//! 7. **Split**: morning/evening requirements, re-coalescing after each split
//! 8. **Synthesis**: merged weather, timing and remarks per bucket
//!
//! Data problems never abort a run. They are returned as
//! [`GenerationWarning`]s next to every visit that could still be placed.
//!
//! # Example
//! ```
//! use chrono::NaiveDate;
//! use survey_schedule::config::PlannerConfig;
//! use survey_schedule::generation::{GenerationRequest, VisitGenerator};
//! use survey_schedule::models::{Family, Function, Protocol, Species};
//!
//! let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
//! let gd = Species::new(1, "Gewone dwergvleermuis", Family::new(1, "Vleermuis"));
//! let protocols = vec![
//!     Protocol::new(1, gd.clone(), Function::new(1, "Kraamverblijfplaats"))
//!         .with_window(d(5, 15), d(7, 15)),
//!     Protocol::new(2, gd, Function::new(2, "Zomerverblijfplaats"))
//!         .with_window(d(4, 15), d(8, 15)),
//! ];
//!
//! let generator = VisitGenerator::new(PlannerConfig::default());
//! let outcome = generator.generate(&GenerationRequest::new(protocols).with_target_year(2025));
//! assert_eq!(outcome.visits.len(), 1);
//! assert_eq!(outcome.visits[0].from_date, d(5, 15));
//! ```

/// Generation trace: `info` when the debug toggle is on, `debug` otherwise.
macro_rules! gen_trace {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

mod bucketing;
mod coalesce;
mod completion;
mod occurrence;
mod solo;
mod synthesis;

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::compatibility::{CompatibilityMatrix, CompatibilityOracle};
use crate::config::PlannerConfig;
use crate::models::{FunctionId, Protocol, ProtocolId, SpeciesId, Visit};
use crate::validation::{validate_protocols, GenerationWarning, WarningKind};
use bucketing::BucketSet;
use occurrence::SlotTable;

pub use synthesis::relative_time_text;

/// Input of one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Protocols to cover, in caller order.
    pub protocols: Vec<Protocol>,
    /// Scheduling year. Defaults to the current local year.
    pub target_year: Option<i32>,
    /// Correlation key. Defaults to a fresh UUID.
    pub group_id: Option<String>,
}

impl GenerationRequest {
    /// Creates a request for the given protocols.
    pub fn new(protocols: Vec<Protocol>) -> Self {
        Self {
            protocols,
            target_year: None,
            group_id: None,
        }
    }

    /// Protocols matching both a selected species and a selected function.
    pub fn from_selection(
        catalog: &[Protocol],
        species_ids: &[SpeciesId],
        function_ids: &[FunctionId],
    ) -> Self {
        let species: HashSet<SpeciesId> = species_ids.iter().copied().collect();
        let functions: HashSet<FunctionId> = function_ids.iter().copied().collect();
        Self::new(
            catalog
                .iter()
                .filter(|p| species.contains(&p.species.id) && functions.contains(&p.function.id))
                .cloned()
                .collect(),
        )
    }

    /// Sets the scheduling year.
    pub fn with_target_year(mut self, year: i32) -> Self {
        self.target_year = Some(year);
        self
    }

    /// Sets the correlation key.
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Result of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Correlation key shared by all visits.
    pub group_id: String,
    /// Generated visits, ordered by window.
    pub visits: Vec<Visit>,
    /// Data-quality findings, attributable per protocol.
    pub warnings: Vec<GenerationWarning>,
}

impl GenerationOutcome {
    /// Number of occurrences of `protocol_id` attributed across all visits.
    pub fn occurrences_of(&self, protocol_id: ProtocolId) -> usize {
        self.visits
            .iter()
            .flat_map(|v| v.occurrences.iter())
            .filter(|o| o.protocol_id == protocol_id)
            .map(|o| o.visit_index)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// The visit generation engine.
#[derive(Debug, Clone)]
pub struct VisitGenerator {
    config: PlannerConfig,
    oracle: CompatibilityOracle,
}

impl VisitGenerator {
    /// Creates a generator with the standard compatibility table.
    pub fn new(config: PlannerConfig) -> Self {
        let oracle = CompatibilityOracle::default_for(&config);
        Self { config, oracle }
    }

    /// Replaces the compatibility oracle.
    pub fn with_oracle(mut self, oracle: CompatibilityOracle) -> Self {
        self.oracle = oracle;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Generates visits for `request`.
    pub fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let debug = self.config.debug;
        let protocols = request.protocols.as_slice();
        let year = request.target_year.unwrap_or_else(|| Local::now().year());
        let group_id = request
            .group_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut warnings = validate_protocols(protocols);

        let table = SlotTable::build(protocols, year, &self.config.solo_families);
        let matrix = CompatibilityMatrix::build(&self.oracle, &table.occurrences(protocols));
        gen_trace!(
            debug,
            group_id = %group_id,
            year,
            protocols = protocols.len(),
            occurrences = table.slots.len(),
            "expanded protocol occurrences"
        );

        let mut set = BucketSet::new(
            &table,
            protocols,
            &matrix,
            self.config.min_effective_window_days,
        );
        set.bucket_by_index(&mut warnings);
        gen_trace!(debug, buckets = set.buckets.len(), "bucketed by visit index");

        solo::place_solo(&mut set, &mut warnings);
        let merged = coalesce::coalesce(&mut set);
        gen_trace!(debug, merged, buckets = set.buckets.len(), "coalesced");

        completion::complete(&mut set, &mut warnings);

        // At most two splits per protocol
        let mut warned = HashSet::new();
        let mut splits = 0usize;
        for _ in 0..=2 * protocols.len() {
            let split = completion::split_day_parts(&mut set, &mut warned, &mut warnings);
            coalesce::coalesce(&mut set);
            if !split {
                break;
            }
            splits += 1;
        }
        gen_trace!(debug, splits, buckets = set.buckets.len(), "completed and split");

        let mut visits: Vec<Visit> = set
            .buckets
            .iter()
            .map(|b| synthesis::synthesize(b, &table, protocols, &group_id))
            .collect();
        visits.sort_by_key(|v| (v.from_date, v.to_date));

        for (i, v) in visits.iter().enumerate() {
            gen_trace!(
                debug,
                visit = i,
                from = %v.from_date,
                to = %v.to_date,
                part = ?v.part_of_day,
                occurrences = ?v.occurrences,
                "visit"
            );
        }

        check_coverage(protocols, &visits, &mut warnings);
        for w in &warnings {
            warn!(kind = ?w.kind, protocol_id = ?w.protocol_id, "{}", w.message);
        }
        info!(
            group_id = %group_id,
            protocols = protocols.len(),
            visits = visits.len(),
            warnings = warnings.len(),
            "visit generation finished"
        );

        GenerationOutcome {
            group_id,
            visits,
            warnings,
        }
    }
}

/// Reports protocols with fewer attributed occurrences than required.
fn check_coverage(protocols: &[Protocol], visits: &[Visit], warnings: &mut Vec<GenerationWarning>) {
    let mut placed: HashMap<ProtocolId, HashSet<u32>> = HashMap::new();
    for o in visits.iter().flat_map(|v| v.occurrences.iter()) {
        placed.entry(o.protocol_id).or_default().insert(o.visit_index);
    }

    let mut checked = HashSet::new();
    for p in protocols {
        if !checked.insert(p.id) {
            continue;
        }
        let required = p.required_visits() as usize;
        let found = placed.get(&p.id).map_or(0, HashSet::len);
        if found < required {
            warnings.push(GenerationWarning::new(
                WarningKind::MissingOccurrence,
                p.id,
                format!("Placed {found} of {required} required occurrences"),
            ));
        }
    }
}
