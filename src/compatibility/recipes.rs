//! Named combination recipes for bat and swift protocols.
//!
//! Recipes are consulted before the generic family rules. A recipe matches
//! on the function/species signature of a pair and, when it matches, fixes
//! the verdict for that pair at that occurrence index.
//!
//! # Recipes
//!
//! | Recipe | Signature | Verdict |
//! |--------|-----------|---------|
//! | `KraamZomer` | bat Kraamverblijfplaats + Zomerverblijfplaats, same species | allow; the shared window is the Kraam window |
//! | `PaarverblijfPair` | Paarverblijf + Paarverblijf | deny when a species is BoV, BrV or TV |
//! | `PaarverblijfMassawinter` | Paarverblijf + Massawinterverblijfplaats | allow only at occurrence 2 of a 3-visit Paarverblijf |
//! | `GierzwaluwInterleave` | 3-visit Gierzwaluw Nest + bat Kraam/Zomer | allow at occurrences 1 and 3, deny at 2 |
//!
//! The Kraam/Zomer window clamp needs no special handling: a visit window is
//! the intersection of its members, which is the Kraam window whenever it
//! lies inside the Zomer window.

use super::rules::same_family;
use super::{CompatibilityRule, Occurrence, Verdict};
use crate::models::Protocol;

/// Species excluded from combined Paarverblijf visits.
pub const PAARVERBLIJF_SOLO_SPECIES: [&str; 3] = ["BoV", "BrV", "TV"];

/// A named recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    KraamZomer,
    PaarverblijfPair,
    PaarverblijfMassawinter,
    GierzwaluwInterleave,
}

impl Recipe {
    /// All recipes in evaluation order.
    pub const ALL: [Recipe; 4] = [
        Recipe::KraamZomer,
        Recipe::PaarverblijfPair,
        Recipe::PaarverblijfMassawinter,
        Recipe::GierzwaluwInterleave,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Recipe::KraamZomer => "KraamZomer",
            Recipe::PaarverblijfPair => "PaarverblijfPair",
            Recipe::PaarverblijfMassawinter => "PaarverblijfMassawinter",
            Recipe::GierzwaluwInterleave => "GierzwaluwInterleave",
        }
    }

    /// Verdict for a pair, or `None` if the signature does not match.
    pub fn apply(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Option<Verdict> {
        match self {
            Recipe::KraamZomer => kraam_zomer(a, b).or_else(|| kraam_zomer(b, a)),
            Recipe::PaarverblijfPair => paarverblijf_pair(a, b),
            Recipe::PaarverblijfMassawinter => {
                paarverblijf_massawinter(a, b).or_else(|| paarverblijf_massawinter(b, a))
            }
            Recipe::GierzwaluwInterleave => {
                gierzwaluw_interleave(a, b).or_else(|| gierzwaluw_interleave(b, a))
            }
        }
    }
}

fn function_is(p: &Protocol, needle: &str) -> bool {
    p.function.name.to_lowercase().contains(needle)
}

fn is_bat(p: &Protocol) -> bool {
    p.family_key() == "vleermuis"
}

fn kraam_zomer(kraam: &Occurrence<'_>, zomer: &Occurrence<'_>) -> Option<Verdict> {
    let (k, z) = (kraam.protocol, zomer.protocol);
    let matches = is_bat(k)
        && is_bat(z)
        && k.species.id == z.species.id
        && function_is(k, "kraamverblijf")
        && function_is(z, "zomerverblijf");
    matches.then_some(Verdict::Allow)
}

fn paarverblijf_pair(a: &Occurrence<'_>, b: &Occurrence<'_>) -> Option<Verdict> {
    if !(function_is(a.protocol, "paarverblijf") && function_is(b.protocol, "paarverblijf")) {
        return None;
    }
    let solo = |p: &Protocol| {
        p.species
            .abbreviation
            .as_deref()
            .is_some_and(|abbr| PAARVERBLIJF_SOLO_SPECIES.contains(&abbr))
    };
    if solo(a.protocol) || solo(b.protocol) {
        Some(Verdict::Deny)
    } else {
        None
    }
}

fn paarverblijf_massawinter(paar: &Occurrence<'_>, winter: &Occurrence<'_>) -> Option<Verdict> {
    if !(function_is(paar.protocol, "paarverblijf")
        && function_is(winter.protocol, "massawinterverblijf"))
    {
        return None;
    }
    // Only the Massawinter pairing is fixed here; other partners of
    // occurrences 1 and 3 fall through to the family rules.
    let second_of_three = paar.protocol.required_visits() == 3 && paar.visit_index == 2;
    Some(if second_of_three && same_family(paar.protocol, winter.protocol) {
        Verdict::Allow
    } else {
        Verdict::Deny
    })
}

fn gierzwaluw_interleave(nest: &Occurrence<'_>, bat: &Occurrence<'_>) -> Option<Verdict> {
    let n = nest.protocol;
    let matches = n.species.name.trim().eq_ignore_ascii_case("gierzwaluw")
        && function_is(n, "nest")
        && n.required_visits() == 3
        && is_bat(bat.protocol)
        && (function_is(bat.protocol, "kraamverblijf")
            || function_is(bat.protocol, "zomerverblijf"));
    if !matches {
        return None;
    }
    Some(if nest.visit_index == 2 {
        Verdict::Deny
    } else {
        Verdict::Allow
    })
}

/// The recipe table as a single compatibility rule.
#[derive(Debug, Clone)]
pub struct RecipeTable {
    recipes: Vec<Recipe>,
}

impl RecipeTable {
    /// Table with the given recipes, consulted in order.
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// The matching recipe and its verdict, if any.
    pub fn lookup(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Option<(Recipe, Verdict)> {
        self.recipes
            .iter()
            .find_map(|r| r.apply(a, b).map(|v| (*r, v)))
    }
}

impl Default for RecipeTable {
    fn default() -> Self {
        Self::new(Recipe::ALL.to_vec())
    }
}

impl CompatibilityRule for RecipeTable {
    fn name(&self) -> &'static str {
        "Recipes"
    }

    fn evaluate(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Verdict {
        self.lookup(a, b)
            .map(|(_, v)| v)
            .unwrap_or(Verdict::Abstain)
    }

    fn description(&self) -> &'static str {
        "Bat and Gierzwaluw combination recipes"
    }
}
