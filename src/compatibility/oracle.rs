//! Ordered rule table deciding protocol compatibility.
//!
//! Rules are evaluated in insertion order; the first rule that does not
//! abstain decides. When every rule abstains the pair is incompatible.

use std::sync::Arc;

use super::recipes::RecipeTable;
use super::rules::{CrossFamily, RugstreeppadRule, SameFamily, SmpGate};
use super::{CompatibilityRule, Occurrence, Verdict};
use crate::config::PlannerConfig;
use crate::models::Protocol;

/// A composable compatibility oracle.
///
/// # Example
/// ```
/// use survey_schedule::compatibility::{CompatibilityOracle, rules};
///
/// let oracle = CompatibilityOracle::new()
///     .with_rule(rules::SmpGate)
///     .with_rule(rules::SameFamily);
/// assert_eq!(oracle.rule_names(), vec!["SMP", "SameFamily"]);
/// ```
#[derive(Clone, Default)]
pub struct CompatibilityOracle {
    rules: Vec<Arc<dyn CompatibilityRule>>,
}

impl CompatibilityOracle {
    /// Creates an empty oracle (denies everything).
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard table: SMP gate, recipes, Rugstreeppad, same family,
    /// then the configured cross-family pairs.
    pub fn default_for(config: &PlannerConfig) -> Self {
        Self::new()
            .with_rule(SmpGate)
            .with_rule(RecipeTable::default())
            .with_rule(RugstreeppadRule)
            .with_rule(SameFamily)
            .with_rule(CrossFamily::new(config.cross_family_pairs.as_slice()))
    }

    /// Appends a rule.
    pub fn with_rule<R: CompatibilityRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Names of the rules in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// The deciding verdict and the rule that produced it.
    ///
    /// Returns `(Verdict::Deny, None)` when all rules abstain.
    pub fn decide(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> (Verdict, Option<&'static str>) {
        self.rules
            .iter()
            .find_map(|rule| match rule.evaluate(a, b) {
                Verdict::Abstain => None,
                verdict => Some((verdict, Some(rule.name()))),
            })
            .unwrap_or((Verdict::Deny, None))
    }

    /// Whether two occurrences may share a visit.
    pub fn allows(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> bool {
        self.decide(a, b).0 == Verdict::Allow
    }

    /// Whether two protocols may share their first occurrence.
    pub fn allows_protocols(&self, a: &Protocol, b: &Protocol) -> bool {
        self.allows(&Occurrence::new(a, 1), &Occurrence::new(b, 1))
    }

    /// Whether `candidate` is compatible with every member.
    pub fn allows_all<'a, I>(&self, candidate: &Occurrence<'_>, members: I) -> bool
    where
        I: IntoIterator<Item = Occurrence<'a>>,
    {
        members.into_iter().all(|m| self.allows(candidate, &m))
    }
}

impl std::fmt::Debug for CompatibilityOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibilityOracle")
            .field("rules", &self.rule_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Family, Function, Species};

    fn protocol(id: u32, family: Family, species: (u32, &str), function: &str) -> Protocol {
        Protocol::new(
            id,
            Species::new(species.0, species.1, family).with_abbreviation(species.1),
            Function::new(id, function),
        )
        .with_visits(2)
    }

    fn bat() -> Family {
        Family::new(1, "Vleermuis")
    }

    fn oracle() -> CompatibilityOracle {
        CompatibilityOracle::default_for(&PlannerConfig::default())
    }

    #[test]
    fn test_default_rule_order() {
        assert_eq!(
            oracle().rule_names(),
            vec!["SMP", "Recipes", "Rugstreeppad", "SameFamily", "CrossFamily"]
        );
    }

    #[test]
    fn test_empty_oracle_denies() {
        let a = protocol(1, bat(), (1, "GD"), "Kraamverblijfplaats");
        let b = protocol(2, bat(), (1, "GD"), "Zomerverblijfplaats");
        let oracle = CompatibilityOracle::new();
        assert_eq!(
            oracle.decide(&Occurrence::new(&a, 1), &Occurrence::new(&b, 1)),
            (Verdict::Deny, None)
        );
    }

    #[test]
    fn test_smp_never_mixes_with_plain() {
        let smp = protocol(1, bat(), (1, "GD"), "SMP Kraamverblijf");
        let plain = protocol(2, bat(), (1, "GD"), "Kraamverblijfplaats");
        let (verdict, rule) = oracle().decide(&Occurrence::new(&smp, 1), &Occurrence::new(&plain, 1));
        assert_eq!(verdict, Verdict::Deny);
        assert_eq!(rule, Some("SMP"));
    }

    #[test]
    fn test_recipe_precedes_family_rule() {
        let paar = protocol(1, bat(), (1, "GD"), "Paarverblijf");
        let bov = protocol(2, bat(), (2, "BoV"), "Paarverblijf");
        let (verdict, rule) = oracle().decide(&Occurrence::new(&paar, 1), &Occurrence::new(&bov, 1));
        assert_eq!(verdict, Verdict::Deny);
        assert_eq!(rule, Some("Recipes"));
    }

    #[test]
    fn test_cross_family_default_pair() {
        let bat_p = protocol(1, bat(), (1, "GD"), "Zomerverblijfplaats");
        let swift = protocol(2, Family::new(2, "Zwaluw"), (9, "HZ"), "Nest");
        let raptor = protocol(3, Family::new(3, "Roofvogel"), (7, "BU"), "Nest");
        let o = oracle();
        assert!(o.allows_protocols(&bat_p, &swift));
        assert!(!o.allows_protocols(&bat_p, &raptor));

        let widened = CompatibilityOracle::default_for(
            &PlannerConfig::default().with_cross_family_pair("Vleermuis", "Roofvogel"),
        );
        assert!(widened.allows_protocols(&bat_p, &raptor));
    }

    #[test]
    fn test_allows_all_checks_every_member() {
        let gd = protocol(1, bat(), (1, "GD"), "Paarverblijf");
        let rd = protocol(2, bat(), (2, "RD"), "Paarverblijf");
        let bov = protocol(3, bat(), (3, "BoV"), "Paarverblijf");
        let o = oracle();

        let members = [Occurrence::new(&gd, 1), Occurrence::new(&bov, 1)];
        assert!(o.allows(&Occurrence::new(&rd, 1), &members[0]));
        assert!(!o.allows_all(&Occurrence::new(&rd, 1), members));
    }
}
