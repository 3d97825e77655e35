//! Parts of day and allowed-part sets.
//!
//! A protocol allows a set of parts of day; `None` (unconstrained) matches
//! anything on intersection. A bucket's set is the intersection of its
//! members' sets, resolved to one concrete part by preference order
//! Morning > Evening > Daytime.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Protocol, TimingReference};

/// The portion of the day a visit takes place in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartOfDay {
    /// Around sunrise ("Ochtend").
    Morning,
    /// Around sunset and night ("Avond").
    Evening,
    /// Daylight hours ("Dag").
    Daytime,
}

impl PartOfDay {
    /// All parts in resolution preference order.
    pub const PREFERENCE: [PartOfDay; 3] =
        [PartOfDay::Morning, PartOfDay::Evening, PartOfDay::Daytime];

    /// Dutch planning label.
    pub fn label(&self) -> &'static str {
        match self {
            PartOfDay::Morning => "Ochtend",
            PartOfDay::Evening => "Avond",
            PartOfDay::Daytime => "Dag",
        }
    }

    /// Parses a Dutch or English label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "ochtend" | "morning" => Some(PartOfDay::Morning),
            "avond" | "evening" => Some(PartOfDay::Evening),
            "dag" | "daytime" => Some(PartOfDay::Daytime),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            PartOfDay::Morning => 0b001,
            PartOfDay::Evening => 0b010,
            PartOfDay::Daytime => 0b100,
        }
    }
}

impl fmt::Display for PartOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A set of allowed parts of day.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PartSet(u8);

impl PartSet {
    /// The empty set.
    pub const EMPTY: PartSet = PartSet(0);

    /// Set with a single part.
    pub fn only(part: PartOfDay) -> Self {
        Self(part.bit())
    }

    /// Set from a list of parts.
    pub fn of(parts: &[PartOfDay]) -> Self {
        Self(parts.iter().fold(0, |acc, p| acc | p.bit()))
    }

    /// Whether a part is allowed.
    #[inline]
    pub fn contains(&self, part: PartOfDay) -> bool {
        self.0 & part.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of parts in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(&self, other: PartSet) -> PartSet {
        PartSet(self.0 | other.0)
    }

    pub fn intersect(&self, other: PartSet) -> PartSet {
        PartSet(self.0 & other.0)
    }

    /// Parts in preference order.
    pub fn iter(&self) -> impl Iterator<Item = PartOfDay> + '_ {
        PartOfDay::PREFERENCE
            .into_iter()
            .filter(move |p| self.contains(*p))
    }

    /// Most preferred part in the set.
    pub fn preferred(&self) -> Option<PartOfDay> {
        self.iter().next()
    }

    /// Allowed parts for a protocol: hard flags first, then timing.
    ///
    /// Both flags set yields the union {Morning, Evening}: each part is
    /// individually required, not jointly. Returns `None` when the protocol
    /// does not constrain the part of day.
    pub fn for_protocol(protocol: &Protocol) -> Option<PartSet> {
        let mut forced = PartSet::EMPTY;
        if protocol.requires_morning_visit {
            forced = forced.union(PartSet::only(PartOfDay::Morning));
        }
        if protocol.requires_evening_visit {
            forced = forced.union(PartSet::only(PartOfDay::Evening));
        }
        if !forced.is_empty() {
            return Some(forced);
        }
        Self::for_timing(protocol)
    }

    /// Allowed parts derived from timing references only.
    pub fn for_timing(protocol: &Protocol) -> Option<PartSet> {
        use TimingReference::*;

        let night = PartSet::of(&[PartOfDay::Evening, PartOfDay::Morning]);
        match (protocol.start_timing_reference, protocol.end_timing_reference) {
            (Some(SunsetToSunrise), _) | (Some(Sunset), Some(Sunrise)) => Some(night),
            (Some(Sunset), _) => Some(PartSet::only(PartOfDay::Evening)),
            (Some(Sunrise), _) => Some(PartSet::only(PartOfDay::Morning)),
            (Some(Daytime), _) => Some(PartSet::only(PartOfDay::Daytime)),
            // Concrete choice deferred to bucket formation.
            (Some(AbsoluteTime), _) => Some(night),
            _ => None,
        }
    }
}

impl fmt::Debug for PartSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Intersects two optional sets; `None` is unconstrained.
pub fn intersect_parts(a: Option<PartSet>, b: Option<PartSet>) -> Option<PartSet> {
    match (a, b) {
        (None, other) | (other, None) => other,
        (Some(x), Some(y)) => Some(x.intersect(y)),
    }
}

/// Whether two optional sets share a part (unconstrained matches all).
pub fn parts_compatible(a: Option<PartSet>, b: Option<PartSet>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => !x.intersect(y).is_empty(),
        _ => true,
    }
}

/// Whether `part` is allowed by an optional set.
pub fn part_allowed(set: Option<PartSet>, part: PartOfDay) -> bool {
    set.map_or(true, |s| s.contains(part))
}
