//! Researcher qualification matching.
//!
//! A researcher qualifies for a visit when they hold:
//! - the family capability of every linked species (families without a
//!   dedicated capability do not restrict)
//! - `Smp` when the first linked function is an SMP function
//! - `Vrfg` when any function is a flight-route or foraging-area survey
//! - every field requirement the visit sets (hub, fiets, wbc, dvp, sleutel)
//!
//! Extra capabilities never disqualify.

use crate::models::{Capability, Researcher, Visit};

/// Capabilities `visit` demands, deduplicated, in check order.
pub fn required_capabilities(visit: &Visit) -> Vec<Capability> {
    let mut required = Vec::new();
    let mut need = |c: Capability| {
        if !required.contains(&c) {
            required.push(c);
        }
    };

    for species in &visit.species {
        if let Some(c) = Capability::for_family(&species.family.name) {
            need(c);
        }
    }
    if visit.is_smp() {
        need(Capability::Smp);
    }
    if visit.has_route_or_foraging_function() {
        need(Capability::Vrfg);
    }

    let r = &visit.requirements;
    for (flag, c) in [
        (r.hub, Capability::Hub),
        (r.fiets, Capability::Fiets),
        (r.wbc, Capability::Wbc),
        (r.dvp, Capability::Dvp),
        (r.sleutel, Capability::Sleutel),
    ] {
        if flag {
            need(c);
        }
    }
    required
}

/// Capabilities `visit` demands that `researcher` lacks.
pub fn missing_capabilities(researcher: &Researcher, visit: &Visit) -> Vec<Capability> {
    required_capabilities(visit)
        .into_iter()
        .filter(|&c| !researcher.has(c))
        .collect()
}

/// Whether `researcher` may staff `visit`.
pub fn qualifies(researcher: &Researcher, visit: &Visit) -> bool {
    required_capabilities(visit)
        .into_iter()
        .all(|c| researcher.has(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Family, FieldRequirements, Function, Species};
    use chrono::NaiveDate;

    fn visit() -> Visit {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        Visit::new(d(1), d(30))
            .with_species(Species::new(1, "Gewone dwergvleermuis", Family::new(1, "Vleermuizen")))
            .with_function(Function::new(1, "Kraamverblijfplaats"))
    }

    #[test]
    fn test_family_capability_required() {
        let v = visit();
        let bat = Researcher::new(1, "A").with_capability(Capability::Vleermuis);
        let birder = Researcher::new(2, "B").with_capability(Capability::Zwaluw);
        assert!(qualifies(&bat, &v));
        assert!(!qualifies(&birder, &v));
        assert_eq!(missing_capabilities(&birder, &v), vec![Capability::Vleermuis]);
    }

    #[test]
    fn test_smp_and_vrfg() {
        let v = visit().with_function(Function::new(2, "Vliegroute"));
        let mut smp = visit();
        smp.functions[0] = Function::new(3, "SMP Kraamverblijfplaats");

        let bat = Researcher::new(1, "A").with_capability(Capability::Vleermuis);
        assert!(!qualifies(&bat, &v));
        assert!(!qualifies(&bat, &smp));

        let full = bat.with_capabilities([Capability::Vrfg, Capability::Smp]);
        assert!(qualifies(&full, &v));
        assert!(qualifies(&full, &smp));
    }

    #[test]
    fn test_bike_visit_excludes_non_cyclist() {
        let v = visit().with_requirements(FieldRequirements {
            fiets: true,
            ..FieldRequirements::default()
        });
        let walker = Researcher::new(1, "A").with_capability(Capability::Vleermuis);
        let cyclist = Researcher::new(2, "B")
            .with_capabilities([Capability::Vleermuis, Capability::Fiets, Capability::Hub]);
        assert!(!qualifies(&walker, &v));
        assert!(qualifies(&cyclist, &v));
    }

    #[test]
    fn test_unmapped_family_does_not_restrict() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        let v = Visit::new(d(1), d(30))
            .with_species(Species::new(5, "Hazelmuis", Family::new(9, "Muizen")));
        assert!(qualifies(&Researcher::new(1, "A"), &v));
    }
}
