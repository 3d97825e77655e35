//! Researcher model.
//!
//! Researchers are the people who carry out visits. Each has a weekly
//! availability per part of day, a set of capabilities (family
//! qualifications and field certificates) and a home location used for
//! travel-time scoring. Researchers are host-owned; the planner only reads
//! them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::{normalize_family_name, PartOfDay};

/// Researcher identifier.
pub type ResearcherId = u32;

/// A researcher who can be assigned to visits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Researcher {
    pub id: ResearcherId,
    pub name: String,
    /// Home address (travel-time origin).
    pub location: Option<String>,
    /// Days available this week per part of day.
    pub availability: WeeklyAvailability,
    pub capabilities: BTreeSet<Capability>,
}

/// Days a researcher is available in one week, per part of day.
///
/// `flex` days may be spent on any part once the dedicated days run out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub morning: u32,
    pub daytime: u32,
    pub evening: u32,
    pub flex: u32,
}

/// A qualification or certificate flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Vleermuis,
    Zwaluw,
    Roofvogel,
    Zangvogel,
    Vlinder,
    Pad,
    Langoor,
    Biggenkruid,
    Schijfhoren,
    Teunisbloempijlstaart,
    /// Species management plan visits.
    Smp,
    /// Flight-route and foraging-area visits.
    Vrfg,
    Hub,
    Fiets,
    Wbc,
    Dvp,
    Sleutel,
}

/// Running assignment counters for one researcher.
///
/// The counters feed the workload and spread terms of the researcher score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearcherLoad {
    /// Visits already assigned.
    pub assigned_visits: u32,
    /// Assigned visits with a team larger than two.
    pub assigned_large_team: u32,
    /// Assigned visits requiring a bike.
    pub assigned_fiets: u32,
    /// Assigned visits per project.
    pub assigned_by_project: HashMap<u32, u32>,
}

impl WeeklyAvailability {
    /// Creates an availability record.
    pub fn new(morning: u32, daytime: u32, evening: u32, flex: u32) -> Self {
        Self {
            morning,
            daytime,
            evening,
            flex,
        }
    }

    /// Dedicated days for one part.
    pub fn for_part(&self, part: PartOfDay) -> u32 {
        match part {
            PartOfDay::Morning => self.morning,
            PartOfDay::Daytime => self.daytime,
            PartOfDay::Evening => self.evening,
        }
    }

    /// Total days, flex included.
    pub fn total(&self) -> u32 {
        self.morning
            .saturating_add(self.daytime)
            .saturating_add(self.evening)
            .saturating_add(self.flex)
    }
}

impl Capability {
    /// Qualification required for a family, by normalized family name.
    ///
    /// Families without a dedicated qualification return `None` and do not
    /// restrict who may visit.
    pub fn for_family(family_name: &str) -> Option<Capability> {
        match normalize_family_name(family_name).as_str() {
            "vleermuis" => Some(Capability::Vleermuis),
            "zwaluw" => Some(Capability::Zwaluw),
            "roofvogel" => Some(Capability::Roofvogel),
            "zangvogel" => Some(Capability::Zangvogel),
            "vlinder" | "grote vos" | "iepenpage" => Some(Capability::Vlinder),
            "pad" => Some(Capability::Pad),
            "langoren" | "langoor" => Some(Capability::Langoor),
            "biggenkruid" => Some(Capability::Biggenkruid),
            "schijfhoren" => Some(Capability::Schijfhoren),
            "teunisbloempijlstaart" => Some(Capability::Teunisbloempijlstaart),
            _ => None,
        }
    }
}

impl Researcher {
    /// Creates a researcher with no availability and no capabilities.
    pub fn new(id: ResearcherId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: None,
            availability: WeeklyAvailability::default(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Sets the home location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the weekly availability.
    pub fn with_availability(mut self, availability: WeeklyAvailability) -> Self {
        self.availability = availability;
        self
    }

    /// Grants a capability.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Grants several capabilities.
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    /// Whether the researcher holds a capability.
    #[inline]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether the researcher can work `part` at all this week.
    pub fn can_work(&self, part: PartOfDay) -> bool {
        self.availability.for_part(part) > 0 || self.availability.flex > 0
    }
}

impl ResearcherLoad {
    /// Assigned visits for a project (0 if none).
    pub fn for_project(&self, project_id: u32) -> u32 {
        self.assigned_by_project
            .get(&project_id)
            .copied()
            .unwrap_or(0)
    }
}
