//! Solo-family placement.
//!
//! Protocols of a solo family (amphibians by default) are never bucketed.
//! Each occurrence becomes its own visit, and consecutive visits of the
//! family are kept apart by the largest minimum gap among its protocols.

use chrono::Duration;

use super::bucketing::{Bucket, BucketSet};
use crate::models::DateWindow;
use crate::validation::GenerationWarning;

/// Places every solo slot in its own bucket.
pub(crate) fn place_solo(set: &mut BucketSet<'_>, warnings: &mut Vec<GenerationWarning>) {
    let table = set.table;
    let protocols = set.protocols;

    // Families in first-seen order
    let mut families: Vec<String> = Vec::new();
    for s in table.slots.iter().filter(|s| s.solo) {
        let key = protocols[s.protocol].family_key();
        if !families.contains(&key) {
            families.push(key);
        }
    }

    for family in families {
        let mut slots: Vec<usize> = (0..table.slots.len())
            .filter(|&i| {
                let s = &table.slots[i];
                s.solo && protocols[s.protocol].family_key() == family
            })
            .collect();
        slots.sort_by_key(|&i| (table.slots[i].window.from, table.slots[i].protocol));

        let gap = slots
            .iter()
            .map(|&i| protocols[table.slots[i].protocol].min_gap_days())
            .max()
            .unwrap_or(0);

        let mut previous_from = None;
        for slot in slots {
            let s = &table.slots[slot];
            let earliest = match previous_from {
                Some(prev) if gap > 0 => s.window.from.max(prev + Duration::days(gap)),
                _ => s.window.from,
            };
            let window = if earliest <= s.window.to {
                DateWindow::new(earliest, s.window.to)
            } else {
                warnings.push(set.gap_warning(slot));
                s.window
            };
            set.push(Bucket {
                members: vec![slot],
                window,
                parts: s.parts,
                fixed_part: None,
                solo: true,
            });
            previous_from = Some(window.from);
        }
    }
}
