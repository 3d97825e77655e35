//! Generic compatibility rules.
//!
//! # Rules
//!
//! | Rule | Decides |
//! |------|---------|
//! | `SmpGate` | Any pair with an SMP protocol |
//! | `RugstreeppadRule` | Rugstreeppad pairs with different functions |
//! | `SameFamily` | Same family (id or normalized name) |
//! | `CrossFamily` | Curated family pairs |

use super::{CompatibilityRule, Occurrence, Verdict};
use crate::models::{normalize_family_name, Protocol};

/// Whether two protocols belong to the same family.
///
/// Matches on family id first, then on normalized family name.
pub fn same_family(a: &Protocol, b: &Protocol) -> bool {
    let fa = &a.species.family;
    let fb = &b.species.family;
    fa.id == fb.id || normalize_family_name(&fa.name) == normalize_family_name(&fb.name)
}

// ======================== SMP ========================

/// SMP protocols only combine with SMP protocols of the same family.
///
/// Decides every pair in which at least one side is SMP; no later rule can
/// widen that.
#[derive(Debug, Clone, Copy)]
pub struct SmpGate;

impl CompatibilityRule for SmpGate {
    fn name(&self) -> &'static str {
        "SMP"
    }

    fn evaluate(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Verdict {
        let (sa, sb) = (a.protocol.is_smp(), b.protocol.is_smp());
        if !sa && !sb {
            return Verdict::Abstain;
        }
        if sa && sb && same_family(a.protocol, b.protocol) {
            Verdict::Allow
        } else {
            Verdict::Deny
        }
    }

    fn description(&self) -> &'static str {
        "SMP only with SMP of the same family"
    }
}

// ======================== Rugstreeppad ========================

/// Rugstreeppad protocols for different functions are surveyed separately.
#[derive(Debug, Clone, Copy)]
pub struct RugstreeppadRule;

const RUGSTREEPPAD: &str = "rugstreeppad";

impl CompatibilityRule for RugstreeppadRule {
    fn name(&self) -> &'static str {
        "Rugstreeppad"
    }

    fn evaluate(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Verdict {
        let is_toad = |p: &Protocol| p.species.name.trim().eq_ignore_ascii_case(RUGSTREEPPAD);
        if is_toad(a.protocol)
            && is_toad(b.protocol)
            && a.protocol.function.id != b.protocol.function.id
        {
            Verdict::Deny
        } else {
            Verdict::Abstain
        }
    }
}

// ======================== Family ========================

/// Protocols of the same family may combine.
#[derive(Debug, Clone, Copy)]
pub struct SameFamily;

impl CompatibilityRule for SameFamily {
    fn name(&self) -> &'static str {
        "SameFamily"
    }

    fn evaluate(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Verdict {
        if same_family(a.protocol, b.protocol) {
            Verdict::Allow
        } else {
            Verdict::Abstain
        }
    }
}

/// Curated family pairs that may share a visit (e.g. Vleermuis + Zwaluw).
#[derive(Debug, Clone, Default)]
pub struct CrossFamily {
    pairs: Vec<(String, String)>,
}

impl CrossFamily {
    /// Creates the rule from family name pairs (normalized on entry).
    pub fn new<S: AsRef<str>>(pairs: &[[S; 2]]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|[a, b]| {
                    (
                        normalize_family_name(a.as_ref()),
                        normalize_family_name(b.as_ref()),
                    )
                })
                .collect(),
        }
    }

    fn listed(&self, a: &str, b: &str) -> bool {
        self.pairs
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

impl CompatibilityRule for CrossFamily {
    fn name(&self) -> &'static str {
        "CrossFamily"
    }

    fn evaluate(&self, a: &Occurrence<'_>, b: &Occurrence<'_>) -> Verdict {
        let fa = a.protocol.family_key();
        let fb = b.protocol.family_key();
        if fa != fb && self.listed(&fa, &fb) {
            Verdict::Allow
        } else {
            Verdict::Abstain
        }
    }

    fn description(&self) -> &'static str {
        "Allow-listed family pairs"
    }
}
