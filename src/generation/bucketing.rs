//! Greedy bucketing of occurrences into shared visits.
//!
//! # Algorithm
//!
//! Visit indices are processed in increasing order. Within an index the
//! occurrences are taken tightest window first (stable on input order) and
//! each one joins the first existing bucket that accepts it:
//!
//! 1. the bucket holds no other occurrence of the same protocol
//! 2. the occurrence is compatible with every member
//! 3. the intersected window spans at least the configured minimum
//! 4. the allowed parts of day still intersect
//! 5. the minimum gap to the protocol's neighbouring occurrences holds,
//!    for the candidate and for every member whose window start moves
//!
//! Otherwise it opens a new bucket on its own window, starting no earlier
//! than the previous occurrence's start plus the protocol's minimum gap.
//! A new bucket always fits: when the gap pushes the start past the window
//! end the occurrence keeps its full window and a warning is raised.

use chrono::{Duration, NaiveDate};

use super::occurrence::SlotTable;
use crate::compatibility::CompatibilityMatrix;
use crate::models::{intersect_parts, part_allowed, DateWindow, PartOfDay, PartSet, Protocol};
use crate::validation::{GenerationWarning, WarningKind};

/// A provisional group of compatible occurrences.
#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    /// Slot indices, in joining order.
    pub members: Vec<usize>,
    /// Intersection of the member windows (after gap adjustment).
    pub window: DateWindow,
    /// Intersection of the member part sets.
    pub parts: Option<PartSet>,
    /// Part forced by the split pass.
    pub fixed_part: Option<PartOfDay>,
    /// Solo-family bucket; never merged.
    pub solo: bool,
}

/// Resolved part of day of `bucket`: the forced part, else the preferred
/// allowed part. Buckets holding a mating-roost protocol prefer the evening.
pub(crate) fn resolve_part(
    bucket: &Bucket,
    table: &SlotTable,
    protocols: &[Protocol],
) -> Option<PartOfDay> {
    if bucket.fixed_part.is_some() {
        return bucket.fixed_part;
    }
    let parts = bucket.parts?;
    let paarverblijf = bucket
        .members
        .iter()
        .any(|&m| protocols[table.slots[m].protocol].is_paarverblijf());
    if paarverblijf && parts.contains(PartOfDay::Evening) {
        return Some(PartOfDay::Evening);
    }
    parts.preferred()
}

/// The working set of buckets for one generation run.
pub(crate) struct BucketSet<'r> {
    pub table: &'r SlotTable,
    pub protocols: &'r [Protocol],
    pub matrix: &'r CompatibilityMatrix,
    pub min_days: i64,
    pub buckets: Vec<Bucket>,
    placed: Vec<Option<usize>>,
}

impl<'r> BucketSet<'r> {
    pub fn new(
        table: &'r SlotTable,
        protocols: &'r [Protocol],
        matrix: &'r CompatibilityMatrix,
        min_days: i64,
    ) -> Self {
        Self {
            table,
            protocols,
            matrix,
            min_days,
            buckets: Vec::new(),
            placed: vec![None; table.slots.len()],
        }
    }

    /// Bucket holding a slot.
    #[inline]
    pub fn bucket_of(&self, slot: usize) -> Option<usize> {
        self.placed[slot]
    }

    /// Resolved part of day of `bucket`, see [`resolve_part`].
    pub fn part_of(&self, bucket: &Bucket) -> Option<PartOfDay> {
        resolve_part(bucket, self.table, self.protocols)
    }

    /// Protocol index of a slot.
    #[inline]
    pub fn protocol_of(&self, slot: usize) -> usize {
        self.table.slots[slot].protocol
    }

    fn contains_protocol(&self, bucket: usize, protocol: usize) -> bool {
        self.buckets[bucket]
            .members
            .iter()
            .any(|&m| self.protocol_of(m) == protocol)
    }

    fn gap_days(&self, slot: usize) -> i64 {
        self.protocols[self.protocol_of(slot)].min_gap_days()
    }

    /// Whether starting `slot` on `from` keeps the minimum gap to its placed
    /// neighbours.
    pub fn gap_ok(&self, slot: usize, from: NaiveDate) -> bool {
        let gap = self.gap_days(slot);
        if gap <= 0 {
            return true;
        }
        let gap = Duration::days(gap);
        if let Some(pb) = self.table.predecessor(slot).and_then(|p| self.placed[p]) {
            if from < self.buckets[pb].window.from + gap {
                return false;
            }
        }
        if let Some(sb) = self.table.successor(slot).and_then(|s| self.placed[s]) {
            if self.buckets[sb].window.from < from + gap {
                return false;
            }
        }
        true
    }

    /// Earliest start for `slot` honoring the gap after its predecessor.
    pub fn earliest_start(&self, slot: usize) -> NaiveDate {
        let own = self.table.slots[slot].window.from;
        let gap = self.gap_days(slot);
        match self.table.predecessor(slot).and_then(|p| self.placed[p]) {
            Some(pb) if gap > 0 => own.max(self.buckets[pb].window.from + Duration::days(gap)),
            _ => own,
        }
    }

    /// Window and parts `bucket` would have after accepting `slot`, or
    /// `None` when any joining condition fails.
    pub fn try_join(&self, slot: usize, bucket: usize) -> Option<(DateWindow, Option<PartSet>)> {
        let s = &self.table.slots[slot];
        let b = &self.buckets[bucket];
        if b.solo || s.solo || self.contains_protocol(bucket, s.protocol) {
            return None;
        }
        if !self.matrix.compatible_with_all(slot, &b.members) {
            return None;
        }
        let window = b.window.intersect(&s.window)?;
        if window.span_days() < self.min_days {
            return None;
        }
        let parts = intersect_parts(b.parts, s.parts);
        if parts.is_some_and(|p| p.is_empty()) {
            return None;
        }
        if let Some(fixed) = b.fixed_part {
            if !part_allowed(s.parts, fixed) {
                return None;
            }
        }
        if !self.gap_ok(slot, window.from) {
            return None;
        }
        if window.from != b.window.from && !b.members.iter().all(|&m| self.gap_ok(m, window.from))
        {
            return None;
        }
        Some((window, parts))
    }

    /// Adds `slot` to `bucket` with a window and parts from [`try_join`](Self::try_join).
    pub fn join(&mut self, slot: usize, bucket: usize, window: DateWindow, parts: Option<PartSet>) {
        let b = &mut self.buckets[bucket];
        b.members.push(slot);
        b.window = window;
        b.parts = parts;
        self.placed[slot] = Some(bucket);
    }

    /// Opens a single-occurrence bucket. Returns `false` when the minimum
    /// gap could not be honored inside the window.
    pub fn open(&mut self, slot: usize) -> bool {
        let table = self.table;
        let s = &table.slots[slot];
        let from = self.earliest_start(slot);
        let (window, honored) = if from <= s.window.to {
            (DateWindow::new(from, s.window.to), true)
        } else {
            (s.window, false)
        };
        self.push(Bucket {
            members: vec![slot],
            window,
            parts: s.parts,
            fixed_part: None,
            solo: s.solo,
        });
        honored
    }

    /// Appends a bucket and records its members' placement.
    pub fn push(&mut self, bucket: Bucket) -> usize {
        let idx = self.buckets.len();
        for &m in &bucket.members {
            self.placed[m] = Some(idx);
        }
        self.buckets.push(bucket);
        idx
    }

    /// Joins the first accepting bucket or opens a new one.
    ///
    /// Returns `false` when a new bucket could not honor the minimum gap.
    pub fn place(&mut self, slot: usize) -> bool {
        let joined = (0..self.buckets.len())
            .find_map(|b| self.try_join(slot, b).map(|(w, p)| (b, w, p)));
        match joined {
            Some((b, window, parts)) => {
                self.join(slot, b, window, parts);
                true
            }
            None => self.open(slot),
        }
    }

    /// Drops empty buckets and rebuilds the slot placement index.
    pub fn compact(&mut self) {
        self.buckets.retain(|b| !b.members.is_empty());
        self.placed.iter_mut().for_each(|p| *p = None);
        for (bi, b) in self.buckets.iter().enumerate() {
            for &m in &b.members {
                self.placed[m] = Some(bi);
            }
        }
    }

    /// Warning for an occurrence whose gap could not be honored.
    pub fn gap_warning(&self, slot: usize) -> GenerationWarning {
        let s = &self.table.slots[slot];
        let p = &self.protocols[s.protocol];
        GenerationWarning::new(
            WarningKind::UnplaceableWindow,
            p.id,
            format!(
                "Occurrence {} cannot keep a {}-day gap inside {}..{}; using the full window",
                s.visit_index,
                p.min_gap_days(),
                s.window.from,
                s.window.to
            ),
        )
    }

    /// Main bucketing pass over all non-solo, non-extra occurrences.
    pub fn bucket_by_index(&mut self, warnings: &mut Vec<GenerationWarning>) {
        for index in 1..=self.table.max_visit_index() {
            let mut round: Vec<usize> = self
                .table
                .slots
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.solo && !s.extra && s.visit_index == index)
                .map(|(i, _)| i)
                .collect();
            round.sort_by_key(|&i| self.table.slots[i].window.span_days());

            for slot in round {
                if !self.place(slot) {
                    warnings.push(self.gap_warning(slot));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::CompatibilityOracle;
    use crate::config::PlannerConfig;
    use crate::models::{Family, Function, MinPeriod, Species, TimingReference};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn bat(id: u32, function: &str) -> Protocol {
        Protocol::new(
            id,
            Species::new(1, "Gewone dwergvleermuis", Family::new(1, "Vleermuis"))
                .with_abbreviation("GD"),
            Function::new(id, function),
        )
    }

    /// Runs the main pass and returns member protocol ids per bucket.
    fn run(protocols: &[Protocol], min_days: i64) -> (Vec<Vec<u32>>, Vec<DateWindow>, usize) {
        let table = SlotTable::build(protocols, 2025, &[]);
        let oracle = CompatibilityOracle::default_for(&PlannerConfig::default());
        let matrix = CompatibilityMatrix::build(&oracle, &table.occurrences(protocols));
        let mut set = BucketSet::new(&table, protocols, &matrix, min_days);
        let mut warnings = Vec::new();
        set.bucket_by_index(&mut warnings);
        let ids = set
            .buckets
            .iter()
            .map(|b| {
                b.members
                    .iter()
                    .map(|&m| protocols[set.protocol_of(m)].id)
                    .collect()
            })
            .collect();
        let windows = set.buckets.iter().map(|b| b.window).collect();
        (ids, windows, warnings.len())
    }

    #[test]
    fn test_tightest_window_first() {
        let protocols = vec![
            bat(1, "Zomerverblijfplaats").with_window(d(4, 15), d(8, 15)),
            bat(2, "Kraamverblijfplaats").with_window(d(5, 15), d(7, 15)),
        ];
        let (ids, windows, _) = run(&protocols, 14);
        // Kraam (tighter) opens the bucket, Zomer joins
        assert_eq!(ids, vec![vec![2, 1]]);
        assert_eq!(windows[0], DateWindow::new(d(5, 15), d(7, 15)));
    }

    #[test]
    fn test_short_intersection_opens_new_bucket() {
        let protocols = vec![
            bat(1, "Vliegroute").with_window(d(5, 1), d(6, 10)),
            bat(2, "Foerageergebied").with_window(d(6, 1), d(7, 31)),
        ];
        // Intersection 1..10 June spans 9 days
        let (ids, _, _) = run(&protocols, 14);
        assert_eq!(ids, vec![vec![1], vec![2]]);
        let (ids, _, _) = run(&protocols, 9);
        assert_eq!(ids, vec![vec![1, 2]]);
    }

    #[test]
    fn test_disjoint_parts_not_joined() {
        let protocols = vec![
            bat(1, "Vliegroute")
                .with_start(TimingReference::Sunset, Some(0))
                .with_window(d(5, 1), d(7, 1)),
            bat(2, "Foerageergebied")
                .with_start(TimingReference::Daytime, None)
                .with_window(d(5, 1), d(7, 1)),
            bat(3, "Zomerverblijfplaats").with_window(d(5, 1), d(7, 1)),
        ];
        let (ids, _, _) = run(&protocols, 14);
        // Unconstrained protocol 3 joins the first bucket
        assert_eq!(ids, vec![vec![1, 3], vec![2]]);
    }

    #[test]
    fn test_second_index_respects_gap() {
        let protocols = vec![bat(1, "Zomerverblijfplaats")
            .with_min_period(MinPeriod::days(20))
            .with_window(d(5, 1), d(6, 30))
            .with_window(d(5, 10), d(7, 31))];
        let (ids, windows, warnings) = run(&protocols, 14);
        assert_eq!(ids.len(), 2);
        assert_eq!(windows[1].from, d(5, 21));
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_gap_unfit_keeps_window_and_warns() {
        let protocols = vec![bat(1, "Zomerverblijfplaats")
            .with_min_period(MinPeriod::weeks(8))
            .with_window(d(5, 1), d(5, 31))
            .with_window(d(5, 15), d(6, 15))];
        let (_, windows, warnings) = run(&protocols, 14);
        assert_eq!(windows[1], DateWindow::new(d(5, 15), d(6, 15)));
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_join_rejected_when_member_gap_breaks() {
        // Protocol 1 occurrence 1 starts 1 May; occurrence 2 starts 15 May
        // (gap 14). Protocol 2 would pull bucket 1 to start 10 May.
        let protocols = vec![
            bat(1, "Zomerverblijfplaats")
                .with_min_period(MinPeriod::days(14))
                .with_window(d(5, 1), d(6, 30))
                .with_window(d(5, 15), d(6, 30)),
            bat(2, "Vliegroute")
                .with_visits(2)
                .with_window(d(5, 10), d(6, 30))
                .with_window(d(5, 10), d(6, 30)),
        ];
        let table = SlotTable::build(&protocols, 2025, &[]);
        let oracle = CompatibilityOracle::default_for(&PlannerConfig::default());
        let matrix = CompatibilityMatrix::build(&oracle, &table.occurrences(&protocols));
        let mut set = BucketSet::new(&table, &protocols, &matrix, 14);
        assert!(set.open(0));
        assert!(set.open(1));
        assert_eq!(set.buckets[1].window.from, d(5, 15));
        // Slot 2 is protocol 2 occurrence 1
        assert!(set.try_join(2, 0).is_none());
        assert!(set.try_join(2, 1).is_some());
    }
}
