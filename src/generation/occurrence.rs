//! Occurrence expansion: protocols to dated, part-constrained slots.
//!
//! Every required window of a protocol becomes one slot, shifted onto the
//! target year. A protocol needing more visits than it has windows gets
//! extra slots on its last window; those are placed by the completion pass
//! rather than by bucketing.

use std::collections::HashSet;

use crate::compatibility::Occurrence;
use crate::models::{normalize_family_name, DateWindow, PartOfDay, PartSet, Protocol};

/// One required occurrence of one protocol.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    /// Index into the request's protocol list.
    pub protocol: usize,
    /// 1-based visit index.
    pub visit_index: u32,
    /// Window on the target year.
    pub window: DateWindow,
    /// Allowed parts of day (`None` = unconstrained).
    pub parts: Option<PartSet>,
    /// Placed by completion instead of bucketing.
    pub extra: bool,
    /// Protocol belongs to a solo family.
    pub solo: bool,
}

/// All slots of a run plus per-protocol ordering.
#[derive(Debug, Clone, Default)]
pub(crate) struct SlotTable {
    pub slots: Vec<Slot>,
    /// Slot indices per protocol, in visit-index order.
    pub by_protocol: Vec<Vec<usize>>,
}

impl SlotTable {
    /// Expands `protocols` onto `year`.
    ///
    /// Inverted windows and repeated visit indices are skipped; validation
    /// reports them.
    pub fn build(protocols: &[Protocol], year: i32, solo_families: &[String]) -> Self {
        let solo_keys: HashSet<String> = solo_families
            .iter()
            .map(|f| normalize_family_name(f))
            .collect();
        let mut table = SlotTable {
            slots: Vec::new(),
            by_protocol: vec![Vec::new(); protocols.len()],
        };

        for (pi, p) in protocols.iter().enumerate() {
            let solo = solo_keys.contains(&p.family_key());
            let required = p.required_visits() as usize;

            let mut seen = HashSet::new();
            let windows: Vec<_> = p
                .required_windows()
                .into_iter()
                .filter(|w| w.window.is_valid() && seen.insert(w.visit_index))
                .take(required)
                .collect();

            for (ordinal, w) in windows.iter().enumerate() {
                table.push(Slot {
                    protocol: pi,
                    visit_index: w.visit_index,
                    window: w.window.shift_to_year(year),
                    parts: parts_for(p, ordinal),
                    extra: false,
                    solo,
                });
            }

            if let Some(last) = windows.last() {
                let mut next_index = last.visit_index;
                for ordinal in windows.len()..required {
                    next_index += 1;
                    table.push(Slot {
                        protocol: pi,
                        visit_index: next_index,
                        window: last.window.shift_to_year(year),
                        parts: parts_for(p, ordinal),
                        extra: true,
                        solo,
                    });
                }
            }
        }

        table
    }

    fn push(&mut self, slot: Slot) {
        let idx = self.slots.len();
        self.by_protocol[slot.protocol].push(idx);
        self.slots.push(slot);
    }

    /// Borrowed occurrence views, index-aligned with `slots`.
    pub fn occurrences<'p>(&self, protocols: &'p [Protocol]) -> Vec<Occurrence<'p>> {
        self.slots
            .iter()
            .map(|s| Occurrence::new(&protocols[s.protocol], s.visit_index))
            .collect()
    }

    /// Previous slot of the same protocol.
    pub fn predecessor(&self, slot: usize) -> Option<usize> {
        let list = &self.by_protocol[self.slots[slot].protocol];
        let pos = list.iter().position(|&s| s == slot)?;
        pos.checked_sub(1).map(|p| list[p])
    }

    /// Next slot of the same protocol.
    pub fn successor(&self, slot: usize) -> Option<usize> {
        let list = &self.by_protocol[self.slots[slot].protocol];
        let pos = list.iter().position(|&s| s == slot)?;
        list.get(pos + 1).copied()
    }

    /// Highest visit index among bucketed (non-extra) slots.
    pub fn max_visit_index(&self) -> u32 {
        self.slots
            .iter()
            .filter(|s| !s.extra)
            .map(|s| s.visit_index)
            .max()
            .unwrap_or(0)
    }
}

/// The first occurrence honors the morning/evening flags; later ones follow
/// the timing reference only. The first RD mating-roost visit starts at
/// midnight and stays in the evening.
fn parts_for(protocol: &Protocol, ordinal: usize) -> Option<PartSet> {
    if ordinal == 0 && starts_at_midnight(protocol) {
        Some(PartSet::only(PartOfDay::Evening))
    } else if ordinal == 0 {
        PartSet::for_protocol(protocol)
    } else {
        PartSet::for_timing(protocol)
    }
}

/// First visit of the RD mating-roost protocol, fixed at 00:00.
pub(crate) fn starts_at_midnight(protocol: &Protocol) -> bool {
    protocol.is_paarverblijf() && protocol.is_species("RD")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Family, Function, PartOfDay, ProtocolVisitWindow, Species, TimingReference};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn protocol(id: u32, family: &str) -> Protocol {
        Protocol::new(
            id,
            Species::new(id, "Soort", Family::new(id, family)),
            Function::new(id, "Functie"),
        )
    }

    #[test]
    fn test_slots_shifted_and_ordered() {
        let p = protocol(1, "Vleermuis")
            .with_visit_window(ProtocolVisitWindow::new(2, d(2000, 6, 15), d(2000, 7, 15)))
            .with_visit_window(ProtocolVisitWindow::new(1, d(2000, 5, 15), d(2000, 6, 15)));
        let table = SlotTable::build(&[p], 2025, &[]);

        assert_eq!(table.slots.len(), 2);
        assert_eq!(table.by_protocol[0], vec![0, 1]);
        assert_eq!(table.slots[0].visit_index, 1);
        assert_eq!(table.slots[0].window.from, d(2025, 5, 15));
        assert_eq!(table.predecessor(1), Some(0));
        assert_eq!(table.successor(0), Some(1));
        assert_eq!(table.predecessor(0), None);
        assert_eq!(table.max_visit_index(), 2);
    }

    #[test]
    fn test_first_occurrence_uses_flags() {
        let p = protocol(1, "Vleermuis")
            .with_visits(2)
            .with_start(TimingReference::Sunset, Some(0))
            .with_window(d(2000, 5, 15), d(2000, 6, 15))
            .with_window(d(2000, 6, 15), d(2000, 7, 15))
            .requiring_morning();
        let table = SlotTable::build(&[p], 2025, &[]);

        assert_eq!(table.slots[0].parts, Some(PartSet::only(PartOfDay::Morning)));
        assert_eq!(table.slots[1].parts, Some(PartSet::only(PartOfDay::Evening)));
    }

    #[test]
    fn test_rd_mating_roost_first_visit_in_evening() {
        let rd = Protocol::new(
            1,
            Species::new(1, "Ruige dwergvleermuis", Family::new(1, "Vleermuis"))
                .with_abbreviation("RD"),
            Function::new(1, "Paarverblijf"),
        )
        .with_start(TimingReference::Sunrise, Some(-120))
        .with_window(d(2000, 8, 15), d(2000, 9, 15))
        .with_window(d(2000, 9, 15), d(2000, 10, 1));
        let table = SlotTable::build(&[rd], 2025, &[]);

        assert_eq!(table.slots[0].parts, Some(PartSet::only(PartOfDay::Evening)));
        assert_eq!(table.slots[1].parts, Some(PartSet::only(PartOfDay::Morning)));
    }

    #[test]
    fn test_extra_slots_when_visits_exceed_windows() {
        let p = protocol(1, "Vleermuis")
            .with_visits(3)
            .with_window(d(2000, 5, 1), d(2000, 7, 31));
        let table = SlotTable::build(&[p], 2025, &[]);

        assert_eq!(table.slots.len(), 3);
        assert!(!table.slots[0].extra);
        assert!(table.slots[1].extra && table.slots[2].extra);
        assert_eq!(table.slots[2].visit_index, 3);
        assert_eq!(table.max_visit_index(), 1);
    }

    #[test]
    fn test_visits_fewer_than_windows_truncates() {
        let p = protocol(1, "Vleermuis")
            .with_visits(1)
            .with_window(d(2000, 5, 1), d(2000, 5, 31))
            .with_window(d(2000, 6, 1), d(2000, 6, 30));
        let table = SlotTable::build(&[p], 2025, &[]);
        assert_eq!(table.slots.len(), 1);
    }

    #[test]
    fn test_invalid_windows_skipped_and_solo_marked() {
        let p = protocol(1, "Pad")
            .with_window(d(2000, 7, 1), d(2000, 6, 1))
            .with_visit_window(ProtocolVisitWindow::new(2, d(2000, 4, 1), d(2000, 5, 1)));
        let table = SlotTable::build(&[p], 2025, &["pad".to_string()]);

        // The inverted window is replaced by an extra slot on the valid one
        assert_eq!(table.slots.len(), 2);
        assert_eq!(table.slots[0].visit_index, 2);
        assert!(!table.slots[0].extra);
        assert!(table.slots[1].extra);
        assert!(table.slots[0].solo);
    }
}
