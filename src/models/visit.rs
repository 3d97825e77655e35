//! Visit (generated scheduling unit) model.
//!
//! A visit is one concrete survey event. The generation engine creates
//! visits from protocols; the weekly planner reads them back together with
//! the host-owned planning attributes (team size, field requirements,
//! project, location).
//!
//! # Attribution
//! Each visit records which protocol occurrences it satisfies as a list of
//! [`ProtocolOccurrence`]s. Function and species lists are the union of
//! the contributing protocols, in first-seen order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{DateWindow, Function, PartOfDay, ProtocolId, ResearcherId, Species};

/// Visit identifier (assigned by the host on persistence).
pub type VisitId = u64;

/// One required occurrence of a protocol: its 1-based visit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolOccurrence {
    pub protocol_id: ProtocolId,
    pub visit_index: u32,
}

impl ProtocolOccurrence {
    pub fn new(protocol_id: ProtocolId, visit_index: u32) -> Self {
        Self {
            protocol_id,
            visit_index,
        }
    }
}

/// Protocol requirement flags, OR-ed over contributing protocols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitFlags {
    pub requires_morning_visit: bool,
    pub requires_evening_visit: bool,
    pub requires_june_visit: bool,
    pub requires_maternity_period_visit: bool,
}

impl VisitFlags {
    /// Logical OR of two flag sets.
    pub fn union(self, other: VisitFlags) -> VisitFlags {
        VisitFlags {
            requires_morning_visit: self.requires_morning_visit || other.requires_morning_visit,
            requires_evening_visit: self.requires_evening_visit || other.requires_evening_visit,
            requires_june_visit: self.requires_june_visit || other.requires_june_visit,
            requires_maternity_period_visit: self.requires_maternity_period_visit
                || other.requires_maternity_period_visit,
        }
    }
}

/// Field requirements a researcher must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRequirements {
    /// Hub-based visit.
    pub hub: bool,
    /// Visit by bike.
    pub fiets: bool,
    /// WBC (Wet bescherming) certified researcher needed.
    pub wbc: bool,
    /// DVP certified researcher needed.
    pub dvp: bool,
    /// Researcher needs a key.
    pub sleutel: bool,
}

/// A schedulable survey visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    /// Host-assigned identifier (`None` until persisted).
    pub id: Option<VisitId>,
    /// Correlation key of the generation run.
    pub group_id: Option<String>,
    /// Sequence number within the cluster; owned by the host.
    pub visit_nr: Option<u32>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub part_of_day: Option<PartOfDay>,
    pub start_time_text: Option<String>,
    pub duration_minutes: Option<i64>,
    pub min_temperature_celsius: Option<i32>,
    pub max_wind_force_bft: Option<i32>,
    pub max_precipitation: Option<String>,
    /// Whitelisted planning remarks.
    pub remarks_planning: Option<String>,
    /// Per-function species/occurrence summary for field staff.
    pub remarks_field: Option<String>,
    pub flags: VisitFlags,
    pub functions: Vec<Function>,
    pub species: Vec<Species>,
    pub occurrences: Vec<ProtocolOccurrence>,

    /// Team size (default 1).
    pub required_researchers: u32,
    /// Must be planned first.
    pub priority: bool,
    pub requirements: FieldRequirements,
    pub project_id: Option<u32>,
    /// Address used for travel-time lookups.
    pub location: Option<String>,
    pub preferred_researcher_id: Option<ResearcherId>,
}

impl Visit {
    /// Creates an empty visit over `[from, to]`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            id: None,
            group_id: None,
            visit_nr: None,
            from_date: from,
            to_date: to,
            part_of_day: None,
            start_time_text: None,
            duration_minutes: None,
            min_temperature_celsius: None,
            max_wind_force_bft: None,
            max_precipitation: None,
            remarks_planning: None,
            remarks_field: None,
            flags: VisitFlags::default(),
            functions: Vec::new(),
            species: Vec::new(),
            occurrences: Vec::new(),
            required_researchers: 1,
            priority: false,
            requirements: FieldRequirements::default(),
            project_id: None,
            location: None,
            preferred_researcher_id: None,
        }
    }

    /// Sets the host identifier.
    pub fn with_id(mut self, id: VisitId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the part of day.
    pub fn with_part_of_day(mut self, part: PartOfDay) -> Self {
        self.part_of_day = Some(part);
        self
    }

    /// Adds a species (no deduplication).
    pub fn with_species(mut self, species: Species) -> Self {
        self.species.push(species);
        self
    }

    /// Adds a function (no deduplication).
    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    /// Sets the team size.
    pub fn with_required_researchers(mut self, n: u32) -> Self {
        self.required_researchers = n;
        self
    }

    /// Marks the visit as priority.
    pub fn with_priority(mut self) -> Self {
        self.priority = true;
        self
    }

    /// Sets the field requirements.
    pub fn with_requirements(mut self, requirements: FieldRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Sets the project.
    pub fn with_project(mut self, project_id: u32) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the location address.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Names a preferred researcher.
    pub fn with_preferred_researcher(mut self, id: ResearcherId) -> Self {
        self.preferred_researcher_id = Some(id);
        self
    }

    /// The visit window.
    #[inline]
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.from_date, self.to_date)
    }

    /// Whether the visit carries an occurrence of `protocol_id`.
    pub fn serves_protocol(&self, protocol_id: ProtocolId) -> bool {
        self.occurrences.iter().any(|o| o.protocol_id == protocol_id)
    }

    /// First linked function name ("" when none).
    pub fn first_function_name(&self) -> &str {
        self.functions.first().map(|f| f.name.as_str()).unwrap_or("")
    }

    /// Whether the first linked function is an SMP function.
    pub fn is_smp(&self) -> bool {
        self.functions.first().is_some_and(Function::is_smp)
    }

    /// Whether any linked function is a flight-route or foraging-area survey.
    pub fn has_route_or_foraging_function(&self) -> bool {
        self.functions.iter().any(|f| {
            let name = f.name.to_lowercase();
            name.contains("vliegroute") || name.contains("foerageergebied")
        })
    }

    /// Priority of the first linked species' family.
    pub fn family_priority(&self) -> Option<i32> {
        self.species.first().map(|s| s.family.priority)
    }

    /// Whether the visit needs a bike, DVP or WBC researcher.
    pub fn needs_transport_or_certificate(&self) -> bool {
        self.requirements.fiets || self.requirements.dvp || self.requirements.wbc
    }

    /// Whether the team is larger than two.
    #[inline]
    pub fn is_large_team(&self) -> bool {
        self.required_researchers > 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Family;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn test_visit_builder() {
        let v = Visit::new(d(6, 1), d(6, 15))
            .with_id(7)
            .with_part_of_day(PartOfDay::Evening)
            .with_species(Species::new(1, "Gierzwaluw", Family::new(2, "Zwaluw").with_priority(2)))
            .with_function(Function::new(1, "SMP Nest"))
            .with_function(Function::new(2, "Foerageergebied"))
            .with_required_researchers(3)
            .with_project(9)
            .with_location("Utrecht")
            .with_requirements(FieldRequirements {
                fiets: true,
                ..FieldRequirements::default()
            });

        assert_eq!(v.id, Some(7));
        assert_eq!(v.window().span_days(), 14);
        assert!(v.is_smp());
        assert!(v.has_route_or_foraging_function());
        assert_eq!(v.family_priority(), Some(2));
        assert!(v.is_large_team());
        assert!(v.needs_transport_or_certificate());
        assert_eq!(v.first_function_name(), "SMP Nest");
    }

    #[test]
    fn test_empty_visit_defaults() {
        let v = Visit::new(d(6, 1), d(6, 15));
        assert_eq!(v.required_researchers, 1);
        assert!(!v.is_smp());
        assert_eq!(v.family_priority(), None);
        assert_eq!(v.first_function_name(), "");
        assert!(!v.serves_protocol(1));
    }

    #[test]
    fn test_flags_union() {
        let a = VisitFlags {
            requires_morning_visit: true,
            ..VisitFlags::default()
        };
        let b = VisitFlags {
            requires_june_visit: true,
            ..VisitFlags::default()
        };
        let u = a.union(b);
        assert!(u.requires_morning_visit && u.requires_june_visit);
        assert!(!u.requires_evening_visit);
    }

    #[test]
    fn test_visit_serializes_part_of_day() {
        let v = Visit::new(d(6, 1), d(6, 15)).with_part_of_day(PartOfDay::Morning);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["part_of_day"], "Morning");
        assert_eq!(json["from_date"], "2025-06-01");
    }
}
