//! Completion of extra occurrences and the morning/evening split.
//!
//! # Completion
//! Occurrences beyond a protocol's window count are attached to the first
//! bucket that accepts them (same joining rules as bucketing). If none does,
//! a new bucket is opened after the predecessor plus the minimum gap.
//!
//! # Split
//! A protocol flagged for both a morning and an evening visit must end up
//! with at least one occurrence in each part. When one part is missing, the
//! latest occurrence that is not the sole carrier of the other part moves
//! to a sibling bucket on the same window with the missing part forced.
//! Same-species members that allow the part move along.

use std::collections::HashSet;

use super::bucketing::{Bucket, BucketSet};
use crate::models::{intersect_parts, part_allowed, PartOfDay, PartSet};
use crate::validation::{GenerationWarning, WarningKind};

/// Places every non-solo extra slot.
pub(crate) fn complete(set: &mut BucketSet<'_>, warnings: &mut Vec<GenerationWarning>) {
    let table = set.table;
    for (slot, s) in table.slots.iter().enumerate() {
        if !s.extra || s.solo {
            continue;
        }
        if !set.place(slot) {
            warnings.push(set.gap_warning(slot));
        }
    }
}

fn other_part(part: PartOfDay) -> PartOfDay {
    match part {
        PartOfDay::Morning => PartOfDay::Evening,
        _ => PartOfDay::Morning,
    }
}

/// Performs at most one split. Returns `true` when buckets changed.
///
/// Protocols that cannot be satisfied get one
/// [`WarningKind::UnsatisfiedDayPart`] each, tracked through `warned`.
pub(crate) fn split_day_parts(
    set: &mut BucketSet<'_>,
    warned: &mut HashSet<usize>,
    warnings: &mut Vec<GenerationWarning>,
) -> bool {
    let table = set.table;
    let protocols = set.protocols;

    for (pi, p) in protocols.iter().enumerate() {
        if !(p.requires_morning_visit && p.requires_evening_visit) || warned.contains(&pi) {
            continue;
        }
        let placed: Vec<(usize, Option<PartOfDay>)> = table.by_protocol[pi]
            .iter()
            .filter_map(|&slot| {
                set.bucket_of(slot)
                    .map(|b| (slot, set.part_of(&set.buckets[b])))
            })
            .collect();

        if placed.len() < 2 {
            warned.insert(pi);
            warnings.push(GenerationWarning::new(
                WarningKind::UnsatisfiedDayPart,
                p.id,
                format!(
                    "Needs a morning and an evening visit but has {} occurrence(s)",
                    placed.len()
                ),
            ));
            continue;
        }

        for needed in [PartOfDay::Morning, PartOfDay::Evening] {
            if placed.iter().any(|&(_, part)| part == Some(needed)) {
                continue;
            }
            let other = other_part(needed);
            let carriers = placed
                .iter()
                .filter(|&&(_, part)| part == Some(other))
                .count();
            let candidate = placed
                .iter()
                .rev()
                .find(|&&(_, part)| part != Some(other) || carriers > 1)
                .map(|&(slot, _)| slot);

            match candidate {
                Some(slot) => {
                    move_to_sibling(set, slot, needed);
                    return true;
                }
                None => {
                    warned.insert(pi);
                    warnings.push(GenerationWarning::new(
                        WarningKind::UnsatisfiedDayPart,
                        p.id,
                        format!("No occurrence can move to {}", needed.label()),
                    ));
                    break;
                }
            }
        }
    }
    false
}

/// Moves `slot` and its same-species companions into a new bucket forced
/// to `part`.
fn move_to_sibling(set: &mut BucketSet<'_>, slot: usize, part: PartOfDay) {
    let table = set.table;
    let protocols = set.protocols;
    let Some(bi) = set.bucket_of(slot) else {
        return;
    };
    let species = protocols[table.slots[slot].protocol].species.id;

    let movers: Vec<usize> = set.buckets[bi]
        .members
        .iter()
        .copied()
        .filter(|&m| {
            if m == slot {
                return true;
            }
            let mate = &table.slots[m];
            let mp = &protocols[mate.protocol];
            mp.species.id == species
                && part_allowed(mate.parts, part)
                && !(mp.requires_morning_visit && mp.requires_evening_visit)
        })
        .collect();

    let origin = &mut set.buckets[bi];
    origin.members.retain(|m| !movers.contains(m));
    origin.parts = origin
        .members
        .iter()
        .fold(None, |acc, &m| intersect_parts(acc, table.slots[m].parts));
    let window = origin.window;
    let solo = origin.solo;

    set.push(Bucket {
        members: movers,
        window,
        parts: Some(PartSet::only(part)),
        fixed_part: Some(part),
        solo,
    });
    set.compact();
}
