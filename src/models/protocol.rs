//! Survey protocol model.
//!
//! A protocol is the regulatory template for surveying one species/function
//! pair: how many visits, in which date windows, at what time of day and
//! under which weather limits. Protocols are immutable reference data; the
//! generation engine never mutates them.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{normalize_family_name, DateWindow, Function, Species};

/// Protocol identifier.
pub type ProtocolId = u32;

/// Reference point a protocol's timing is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimingReference {
    Sunset,
    Sunrise,
    SunsetToSunrise,
    Daytime,
    AbsoluteTime,
    FullNight,
}

impl TimingReference {
    /// Parses the stored label (e.g. `"SUNSET_TO_SUNRISE"`).
    ///
    /// Unrecognized labels return `None` and are treated as unconstrained.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "SUNSET" => Some(Self::Sunset),
            "SUNRISE" => Some(Self::Sunrise),
            "SUNSET_TO_SUNRISE" => Some(Self::SunsetToSunrise),
            "DAYTIME" => Some(Self::Daytime),
            "ABSOLUTE_TIME" => Some(Self::AbsoluteTime),
            "FULL_NIGHT" => Some(Self::FullNight),
            _ => None,
        }
    }
}

/// Unit of a minimum period between visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodUnit {
    Days,
    Weeks,
}

/// Minimum period between two consecutive visits of one protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinPeriod {
    pub value: u32,
    pub unit: PeriodUnit,
}

impl MinPeriod {
    pub fn days(value: u32) -> Self {
        Self {
            value,
            unit: PeriodUnit::Days,
        }
    }

    pub fn weeks(value: u32) -> Self {
        Self {
            value,
            unit: PeriodUnit::Weeks,
        }
    }

    /// Parses a value with a free-text unit; unknown units count as days.
    pub fn parse(value: u32, unit: &str) -> Self {
        match unit.trim().to_lowercase().as_str() {
            "week" | "weeks" | "weeken" | "weken" => Self::weeks(value),
            _ => Self::days(value),
        }
    }

    /// Length in days.
    pub fn in_days(&self) -> i64 {
        match self.unit {
            PeriodUnit::Days => i64::from(self.value),
            PeriodUnit::Weeks => i64::from(self.value) * 7,
        }
    }
}

/// One dated window of a protocol, tied to a 1-based visit index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolVisitWindow {
    /// 1-based visit index within the protocol.
    pub visit_index: u32,
    /// Window against the reference year.
    pub window: DateWindow,
    /// Optional windows are not counted as required occurrences.
    pub required: bool,
    /// UI label (e.g. "Juni bezoek").
    pub label: Option<String>,
}

impl ProtocolVisitWindow {
    /// Creates a required window.
    pub fn new(visit_index: u32, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            visit_index,
            window: DateWindow::new(from, to),
            required: true,
            label: None,
        }
    }

    /// Marks the window optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A survey protocol for one species/function pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub id: ProtocolId,
    pub species: Species,
    pub function: Function,
    /// Required number of visits. `None` = number of required windows.
    pub visits: Option<u32>,
    /// Visit duration in hours.
    pub visit_duration_hours: Option<f64>,
    pub min_period_between_visits: Option<MinPeriod>,
    pub start_timing_reference: Option<TimingReference>,
    pub end_timing_reference: Option<TimingReference>,
    /// Start offset to the start reference (minutes, negative = before).
    pub start_time_relative_minutes: Option<i32>,
    /// End offset to the end reference; positive means before the reference.
    pub end_time_relative_minutes: Option<i32>,
    pub start_time_absolute_from: Option<NaiveTime>,
    pub start_time_absolute_to: Option<NaiveTime>,
    pub min_temperature_celsius: Option<i32>,
    pub max_wind_force_bft: Option<i32>,
    /// Free-text precipitation limit (e.g. "droog").
    pub max_precipitation: Option<String>,
    pub visit_conditions_text: Option<String>,
    pub requires_morning_visit: bool,
    pub requires_evening_visit: bool,
    pub requires_june_visit: bool,
    pub requires_maternity_period_visit: bool,
    pub windows: Vec<ProtocolVisitWindow>,
}

impl Protocol {
    /// Creates a protocol with no windows and no constraints.
    pub fn new(id: ProtocolId, species: Species, function: Function) -> Self {
        Self {
            id,
            species,
            function,
            visits: None,
            visit_duration_hours: None,
            min_period_between_visits: None,
            start_timing_reference: None,
            end_timing_reference: None,
            start_time_relative_minutes: None,
            end_time_relative_minutes: None,
            start_time_absolute_from: None,
            start_time_absolute_to: None,
            min_temperature_celsius: None,
            max_wind_force_bft: None,
            max_precipitation: None,
            visit_conditions_text: None,
            requires_morning_visit: false,
            requires_evening_visit: false,
            requires_june_visit: false,
            requires_maternity_period_visit: false,
            windows: Vec::new(),
        }
    }

    /// Sets the required visit count.
    pub fn with_visits(mut self, visits: u32) -> Self {
        self.visits = Some(visits);
        self
    }

    /// Adds a required window for the next visit index.
    pub fn with_window(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        let index = self.windows.len() as u32 + 1;
        self.windows.push(ProtocolVisitWindow::new(index, from, to));
        self
    }

    /// Adds an explicit window record.
    pub fn with_visit_window(mut self, window: ProtocolVisitWindow) -> Self {
        self.windows.push(window);
        self
    }

    /// Sets the start timing reference and offset.
    pub fn with_start(mut self, reference: TimingReference, relative_minutes: Option<i32>) -> Self {
        self.start_timing_reference = Some(reference);
        self.start_time_relative_minutes = relative_minutes;
        self
    }

    /// Sets the end timing reference and offset.
    pub fn with_end(mut self, reference: TimingReference, relative_minutes: Option<i32>) -> Self {
        self.end_timing_reference = Some(reference);
        self.end_time_relative_minutes = relative_minutes;
        self
    }

    /// Sets an absolute start time.
    pub fn with_absolute_start(mut self, from: NaiveTime) -> Self {
        self.start_timing_reference = Some(TimingReference::AbsoluteTime);
        self.start_time_absolute_from = Some(from);
        self
    }

    /// Sets the visit duration (hours).
    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.visit_duration_hours = Some(hours);
        self
    }

    /// Sets the minimum period between visits.
    pub fn with_min_period(mut self, period: MinPeriod) -> Self {
        self.min_period_between_visits = Some(period);
        self
    }

    /// Sets weather limits.
    pub fn with_weather(
        mut self,
        min_temperature_celsius: Option<i32>,
        max_wind_force_bft: Option<i32>,
        max_precipitation: Option<&str>,
    ) -> Self {
        self.min_temperature_celsius = min_temperature_celsius;
        self.max_wind_force_bft = max_wind_force_bft;
        self.max_precipitation = max_precipitation.map(str::to_string);
        self
    }

    /// Sets the free-text visit conditions.
    pub fn with_conditions(mut self, text: impl Into<String>) -> Self {
        self.visit_conditions_text = Some(text.into());
        self
    }

    /// Requires at least one morning visit.
    pub fn requiring_morning(mut self) -> Self {
        self.requires_morning_visit = true;
        self
    }

    /// Requires at least one evening visit.
    pub fn requiring_evening(mut self) -> Self {
        self.requires_evening_visit = true;
        self
    }

    /// Whether the protocol belongs to a species management plan.
    pub fn is_smp(&self) -> bool {
        self.function.is_smp()
    }

    /// Mating-roost ("Paarverblijf") protocol.
    pub fn is_paarverblijf(&self) -> bool {
        self.function.name.trim().eq_ignore_ascii_case("Paarverblijf")
    }

    /// Whether the species abbreviation (or name, when unabbreviated) is `abbr`.
    pub fn is_species(&self, abbr: &str) -> bool {
        self.species.short_name() == abbr
    }

    /// Normalized family name of the protocol's species.
    pub fn family_key(&self) -> String {
        normalize_family_name(&self.species.family.name)
    }

    /// Required windows, ordered by visit index.
    pub fn required_windows(&self) -> Vec<&ProtocolVisitWindow> {
        let mut windows: Vec<_> = self.windows.iter().filter(|w| w.required).collect();
        windows.sort_by_key(|w| w.visit_index);
        windows
    }

    /// Required visit count.
    pub fn required_visits(&self) -> u32 {
        self.visits
            .unwrap_or_else(|| self.windows.iter().filter(|w| w.required).count() as u32)
    }

    /// Minimum gap between consecutive visits (days).
    pub fn min_gap_days(&self) -> i64 {
        self.min_period_between_visits
            .map(|p| p.in_days())
            .unwrap_or(0)
    }

    /// Visit duration in whole minutes.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.visit_duration_hours
            .map(|h| (h * 60.0).round() as i64)
    }
}
