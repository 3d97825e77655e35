//! Compatibility oracle: which protocol occurrences may share a visit.
//!
//! Compatibility is a binary relation over protocol occurrences, decided by
//! an ordered table of rules. Each rule either returns a verdict or abstains;
//! the first non-abstaining rule wins and an exhausted table denies.
//!
//! # Default table
//!
//! | # | Rule | Effect |
//! |---|------|--------|
//! | 1 | `SmpGate` | SMP pairs: allow iff both SMP and same family |
//! | 2 | `RecipeTable` | Bat and Gierzwaluw exceptions (see [`recipes`]) |
//! | 3 | `RugstreeppadRule` | Rugstreeppad with different functions: deny |
//! | 4 | `SameFamily` | Same family id or normalized name: allow |
//! | 5 | `CrossFamily` | Configured family pairs: allow |
//!
//! Compatibility is never transitive: a bucket accepts a candidate only when
//! the candidate is compatible with every member. [`CompatibilityMatrix`]
//! caches the pairwise answers for one generation run.
//!
//! # Usage
//!
//! ```
//! use survey_schedule::compatibility::CompatibilityOracle;
//! use survey_schedule::config::PlannerConfig;
//!
//! let oracle = CompatibilityOracle::default_for(&PlannerConfig::default());
//! assert_eq!(oracle.rule_names()[0], "SMP");
//! ```

mod matrix;
mod oracle;
pub mod recipes;
pub mod rules;

pub use matrix::CompatibilityMatrix;
pub use oracle::CompatibilityOracle;

use crate::models::Protocol;
use std::fmt::Debug;

/// One protocol at one occurrence (1-based visit index).
#[derive(Debug, Clone, Copy)]
pub struct Occurrence<'a> {
    pub protocol: &'a Protocol,
    pub visit_index: u32,
}

impl<'a> Occurrence<'a> {
    pub fn new(protocol: &'a Protocol, visit_index: u32) -> Self {
        Self {
            protocol,
            visit_index,
        }
    }
}

/// Outcome of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The pair may share a visit.
    Allow,
    /// The pair must not share a visit.
    Deny,
    /// The rule has no opinion; the next rule decides.
    Abstain,
}

/// A compatibility rule.
///
/// Rules must be symmetric: `evaluate(a, b) == evaluate(b, a)`.
pub trait CompatibilityRule: Send + Sync + Debug {
    /// Rule name (e.g. "SMP").
    fn name(&self) -> &'static str;

    /// Judges a pair of occurrences.
    fn evaluate(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Verdict;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
