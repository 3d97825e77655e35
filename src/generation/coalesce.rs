//! Coalescing of buckets with identical window and part of day.
//!
//! Two buckets merge only when the union of their members is still
//! pairwise compatible, holds no protocol twice, and (for multi-protocol
//! results) spans the minimum effective window. Buckets that fail any of
//! these stay separate even though their keys match.

use super::bucketing::{Bucket, BucketSet};
use crate::models::intersect_parts;

fn mergeable(set: &BucketSet<'_>, a: &Bucket, b: &Bucket) -> bool {
    if a.solo || b.solo || a.window != b.window || set.part_of(a) != set.part_of(b) {
        return false;
    }
    let shares_protocol = a.members.iter().any(|&x| {
        b.members
            .iter()
            .any(|&y| set.protocol_of(x) == set.protocol_of(y))
    });
    if shares_protocol || a.window.span_days() < set.min_days {
        return false;
    }
    let union: Vec<usize> = a.members.iter().chain(&b.members).copied().collect();
    set.matrix.is_clique(&union)
}

/// Merges matching buckets until none remain. Returns the number of merges.
pub(crate) fn coalesce(set: &mut BucketSet<'_>) -> usize {
    let mut merges = 0;
    loop {
        let pair = (0..set.buckets.len()).find_map(|i| {
            ((i + 1)..set.buckets.len())
                .find(|&j| mergeable(set, &set.buckets[i], &set.buckets[j]))
                .map(|j| (i, j))
        });
        let Some((i, j)) = pair else {
            break;
        };

        let absorbed = set.buckets.remove(j);
        let part = set.part_of(&set.buckets[i]);
        let keep = &mut set.buckets[i];
        keep.members.extend(absorbed.members);
        keep.parts = intersect_parts(keep.parts, absorbed.parts);
        if set.part_of(&set.buckets[i]) != part {
            set.buckets[i].fixed_part = part;
        }
        merges += 1;
    }
    if merges > 0 {
        set.compact();
    }
    merges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::{CompatibilityMatrix, CompatibilityOracle};
    use crate::config::PlannerConfig;
    use crate::generation::occurrence::SlotTable;
    use crate::models::{Family, Function, PartOfDay, Protocol, Species, TimingReference};
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn protocol(id: u32, family: Family, function: &str) -> Protocol {
        Protocol::new(id, Species::new(id, "Soort", family), Function::new(id, function))
            .with_start(TimingReference::Sunset, Some(0))
            .with_window(d(5, 1), d(6, 30))
    }

    fn merged(protocols: &[Protocol], min_days: i64) -> Vec<usize> {
        let table = SlotTable::build(protocols, 2025, &[]);
        let oracle = CompatibilityOracle::default_for(&PlannerConfig::default());
        let matrix = CompatibilityMatrix::build(&oracle, &table.occurrences(protocols));
        let mut set = BucketSet::new(&table, protocols, &matrix, min_days);
        for slot in 0..table.slots.len() {
            set.open(slot);
        }
        coalesce(&mut set);
        set.buckets.iter().map(|b| b.members.len()).collect()
    }

    #[test]
    fn test_identical_compatible_buckets_merge() {
        let bat = Family::new(1, "Vleermuis");
        let protocols = vec![
            protocol(1, bat.clone(), "Vliegroute"),
            protocol(2, bat.clone(), "Foerageergebied"),
            protocol(3, bat, "Zomerverblijfplaats"),
        ];
        assert_eq!(merged(&protocols, 14), vec![3]);
    }

    #[test]
    fn test_incompatible_duplicates_stay_apart() {
        let protocols = vec![
            protocol(1, Family::new(1, "Vleermuis"), "Vliegroute"),
            protocol(2, Family::new(2, "Roofvogel"), "Nest"),
        ];
        assert_eq!(merged(&protocols, 14), vec![1, 1]);
    }

    #[test]
    fn test_short_window_not_merged() {
        let bat = Family::new(1, "Vleermuis");
        let protocols = vec![
            protocol(1, bat.clone(), "Vliegroute"),
            protocol(2, bat, "Foerageergebied"),
        ];
        // Window spans 60 days
        assert_eq!(merged(&protocols, 61), vec![1, 1]);
    }

    #[test]
    fn test_merge_keeps_part() {
        let bat = Family::new(1, "Vleermuis");
        let protocols = vec![
            protocol(1, bat.clone(), "Vliegroute"),
            protocol(2, bat, "Foerageergebied"),
        ];
        let table = SlotTable::build(&protocols, 2025, &[]);
        let oracle = CompatibilityOracle::default_for(&PlannerConfig::default());
        let matrix = CompatibilityMatrix::build(&oracle, &table.occurrences(&protocols));
        let mut set = BucketSet::new(&table, &protocols, &matrix, 14);
        set.open(0);
        set.open(1);
        set.buckets[1].fixed_part = Some(PartOfDay::Evening);

        assert_eq!(coalesce(&mut set), 1);
        assert_eq!(set.part_of(&set.buckets[0]), Some(PartOfDay::Evening));
        assert_eq!(set.bucket_of(1), Some(0));
    }
}
