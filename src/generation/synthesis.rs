//! Visit synthesis: one finished bucket to one [`Visit`].
//!
//! # Merge rules
//!
//! | Field | Rule |
//! |-------|------|
//! | window | bucket window (intersection of members) |
//! | part of day | bucket part, else the first member-derivable part, else morning |
//! | min temperature | maximum over members |
//! | max wind force | minimum over members |
//! | max precipitation | most restrictive known descriptor, else shortest text |
//! | duration | longest member duration |
//! | flags | OR over members |
//! | remarks | allow-listed phrases from the members' condition texts |

use std::collections::BTreeMap;

use chrono::Timelike;

use super::bucketing::{resolve_part, Bucket};
use super::occurrence::{starts_at_midnight, SlotTable};
use crate::models::{
    PartOfDay, PartSet, Protocol, ProtocolOccurrence, TimingReference, Visit, VisitFlags,
};

/// Known precipitation limits, least restrictive first.
const PRECIPITATION_RANK: [&str; 4] = [
    "motregen",
    "geen regen",
    "droog",
    "geen neerslag, geen mist boven watergangen",
];

/// Condition phrases carried into planning remarks.
const REMARK_ALLOWLIST: [&str; 22] = [
    "1x in de kraamperiode",
    "eventueel 1 ochtend",
    "ten minste 1 ochtend",
    "enkel ochtend bezoeken",
    "1 ochtend",
    "relatief warme avonden, bij voorkeur na regen of een weersomslag",
    "fijnmazig schepnet (ravon-type) mee. ook letten op koren en aanwezige individuen. platen neerleggen in plangebied. vuistregel circa 10 platen per 100m geschikt leefgebied.",
    "zo mogelijk 1 ochtend",
    "1 ronde in juni",
    "'s avonds",
    "'s ochtends",
    "geen vrieskou; bezoeken uitvoeren met wbc; periodiek afspelen geluid ransuil.",
    "in omgeving van kraamgroepen en mannenverblijven (zie de bij het protocol gepubliceerde kaart)",
    "bij aantreffen verblijf binnen 3 dagen uitvliegtelling.",
    "6 weken in de periode 15 feb-1 mei of 3 weken in de periode 1 aug-1 okt",
    "1 x per week in de periode",
    "1 x in de kraamperiode",
    "1x buiten kraamperiode",
    "bij voorkeur niet na (hevige) regenbuien",
    "min. 15 tot 19 graden (<50% bewolking) of vanaf 20 graden (>50% bewolking)",
    "minimaal 10 dagen na laatste massawinterverblijfbezoek",
    "1 x in de periode 1 aug - 1 okt",
];

/// Phrase delimiter in `remarks_planning`.
const REMARK_SEPARATOR: &str = " | ";

/// Butterfly surveys start in a fixed midday slot.
const VLINDER_START_TEXT: &str =
    "Tussen 10:00 en 15:00 starten (evt. om 09:00 starten als het dan al 22 graden is en zonnig)";

/// Builds the visit for `bucket`.
pub(crate) fn synthesize(
    bucket: &Bucket,
    table: &SlotTable,
    protocols: &[Protocol],
    group_id: &str,
) -> Visit {
    let members: Vec<(&Protocol, u32)> = bucket
        .members
        .iter()
        .map(|&m| (&protocols[table.slots[m].protocol], table.slots[m].visit_index))
        .collect();
    let protos: Vec<&Protocol> = members.iter().map(|&(p, _)| p).collect();

    let part = resolve_part(bucket, table, protocols)
        .or_else(|| {
            protos
                .iter()
                .find_map(|p| PartSet::for_protocol(p).and_then(|s| s.preferred()))
        })
        .or(Some(PartOfDay::Morning));

    let mut visit = Visit::new(bucket.window.from, bucket.window.to);
    visit.group_id = Some(group_id.to_string());
    visit.part_of_day = part;
    visit.start_time_text = start_time_text(part, &members);
    visit.min_temperature_celsius = protos.iter().filter_map(|p| p.min_temperature_celsius).max();
    visit.max_wind_force_bft = protos.iter().filter_map(|p| p.max_wind_force_bft).min();
    visit.max_precipitation = merge_precipitation(
        protos.iter().filter_map(|p| p.max_precipitation.as_deref()),
    );
    visit.duration_minutes = protos.iter().filter_map(|p| p.duration_minutes()).max();
    visit.flags = protos.iter().fold(VisitFlags::default(), |acc, p| {
        acc.union(VisitFlags {
            requires_morning_visit: p.requires_morning_visit,
            requires_evening_visit: p.requires_evening_visit,
            requires_june_visit: p.requires_june_visit,
            requires_maternity_period_visit: p.requires_maternity_period_visit,
        })
    });
    visit.remarks_planning = planning_remarks(
        protos.iter().filter_map(|p| p.visit_conditions_text.as_deref()),
    );
    visit.remarks_field = field_remarks(&members);

    for &(p, index) in &members {
        if !visit.functions.iter().any(|f| f.id == p.function.id) {
            visit.functions.push(p.function.clone());
        }
        if !visit.species.iter().any(|s| s.id == p.species.id) {
            visit.species.push(p.species.clone());
        }
        visit.occurrences.push(ProtocolOccurrence::new(p.id, index));
    }
    visit
}

/// Start-time description for the resolved part of day.
///
/// Fixed species and function texts (see [`start_time_exception`]) take
/// precedence over the derived ones.
pub(crate) fn start_time_text(
    part: Option<PartOfDay>,
    members: &[(&Protocol, u32)],
) -> Option<String> {
    let part = part?;
    if let Some(text) = start_time_exception(part, members) {
        return Some(text.to_string());
    }
    if part == PartOfDay::Daytime {
        return Some("Overdag".to_string());
    }
    let protos: Vec<&Protocol> = members.iter().map(|&(p, _)| p).collect();
    if let Some(text) = absolute_start_text(&protos) {
        return Some(text);
    }

    let minutes = match part {
        PartOfDay::Morning => {
            let earliest_end = protos
                .iter()
                .filter(|p| p.end_timing_reference == Some(TimingReference::Sunrise))
                .filter_map(|p| p.end_time_relative_minutes.map(|m| -i64::from(m)))
                .min();
            let longest = protos.iter().filter_map(|p| p.duration_minutes()).max();
            match (earliest_end, longest) {
                (Some(end), Some(duration)) => end - duration,
                _ => protos
                    .iter()
                    .filter(|p| p.start_timing_reference == Some(TimingReference::Sunrise))
                    .filter_map(|p| p.start_time_relative_minutes.map(i64::from))
                    .min()
                    .unwrap_or(0),
            }
        }
        _ => {
            let earliest_start = protos
                .iter()
                .filter(|p| {
                    matches!(
                        p.start_timing_reference,
                        Some(TimingReference::Sunset | TimingReference::SunsetToSunrise)
                    )
                })
                .filter_map(|p| p.start_time_relative_minutes.map(i64::from))
                .min();
            earliest_start
                .or_else(|| {
                    protos
                        .iter()
                        .filter(|p| p.end_timing_reference == Some(TimingReference::Sunset))
                        .filter_map(|p| p.end_time_relative_minutes.map(|m| -i64::from(m)))
                        .min()
                })
                .unwrap_or(0)
        }
    };
    Some(relative_time_text(part, minutes))
}

/// Fixed start texts, first match wins.
///
/// | Members | Part | Text |
/// |---------|------|------|
/// | any butterfly (Vlinder) | any | midday slot |
/// | species HM | any | `1-2 uur na zonsopkomst` |
/// | MV mating roost | Evening | `Zonsondergang` |
/// | MV mating roost | Morning | `3 uur voor zonsopgang` |
/// | RD mating roost, visit 1 | any | `00:00` |
fn start_time_exception(part: PartOfDay, members: &[(&Protocol, u32)]) -> Option<&'static str> {
    if members.iter().any(|(p, _)| p.species.family.key() == "vlinder") {
        return Some(VLINDER_START_TEXT);
    }
    if members.iter().any(|(p, _)| p.is_species("HM")) {
        return Some("1-2 uur na zonsopkomst");
    }
    if members
        .iter()
        .any(|(p, _)| p.is_paarverblijf() && p.is_species("MV"))
    {
        match part {
            PartOfDay::Evening => return Some("Zonsondergang"),
            PartOfDay::Morning => return Some("3 uur voor zonsopgang"),
            PartOfDay::Daytime => {}
        }
    }
    if members
        .iter()
        .any(|&(p, index)| index == 1 && starts_at_midnight(p))
    {
        return Some("00:00");
    }
    None
}

/// Earliest clock time when every member starts at an absolute time.
/// Times before 10:00 belong to the following night.
fn absolute_start_text(protos: &[&Protocol]) -> Option<String> {
    if protos.is_empty() {
        return None;
    }
    let mut best: Option<(u32, u32)> = None;
    for p in protos {
        if p.start_timing_reference != Some(TimingReference::AbsoluteTime) {
            return None;
        }
        let time = p.start_time_absolute_from?;
        let minutes = time.hour() * 60 + time.minute();
        let key = if minutes < 600 { minutes + 1440 } else { minutes };
        match best {
            Some((k, _)) if k <= key => {}
            _ => best = Some((key, minutes)),
        }
    }
    best.map(|(_, m)| format!("{:02}:{:02}", m / 60, m % 60))
}

/// Dutch sunrise/sunset-relative phrase, rounded to half hours.
pub fn relative_time_text(part: PartOfDay, minutes: i64) -> String {
    let (event, label) = match part {
        PartOfDay::Morning => ("zonsopkomst", "Zonsopkomst"),
        _ => ("zonsondergang", "Zonsondergang"),
    };
    let half_hours = (minutes.abs() as f64 / 30.0).round() as i64;
    if half_hours == 0 {
        return label.to_string();
    }
    let hours = if half_hours % 2 == 0 {
        format!("{}", half_hours / 2)
    } else {
        format!("{},5", half_hours / 2)
    };
    let direction = if minutes > 0 { "na" } else { "voor" };
    format!("{hours} uur {direction} {event}")
}

/// Most restrictive precipitation limit.
pub(crate) fn merge_precipitation<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let values: Vec<&str> = values.map(str::trim).filter(|v| !v.is_empty()).collect();
    let ranked = values
        .iter()
        .filter_map(|v| {
            PRECIPITATION_RANK
                .iter()
                .position(|r| r.eq_ignore_ascii_case(v))
                .map(|rank| (rank, *v))
        })
        .max_by_key(|&(rank, _)| rank);
    if let Some((_, v)) = ranked {
        return Some(v.to_string());
    }
    values
        .into_iter()
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .map(str::to_string)
}

/// Allow-listed phrases found in the condition texts, in allowlist order.
pub(crate) fn planning_remarks<'a>(texts: impl Iterator<Item = &'a str>) -> Option<String> {
    let texts: Vec<String> = texts.map(str::to_lowercase).collect();
    let found: Vec<&str> = REMARK_ALLOWLIST
        .iter()
        .copied()
        .filter(|phrase| texts.iter().any(|t| t.contains(phrase)))
        .collect();
    (!found.is_empty()).then(|| found.join(REMARK_SEPARATOR))
}

/// "Function: ABBR (1/2), ..." lines when a visit combines functions.
fn field_remarks(members: &[(&Protocol, u32)]) -> Option<String> {
    let mut by_function: BTreeMap<&str, BTreeMap<&str, Vec<u32>>> = BTreeMap::new();
    for &(p, index) in members {
        let indices = by_function
            .entry(p.function.name.as_str())
            .or_default()
            .entry(p.species.short_name())
            .or_default();
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    if by_function.len() < 2 {
        return None;
    }
    let lines: Vec<String> = by_function
        .into_iter()
        .map(|(function, species)| {
            let entries: Vec<String> = species
                .into_iter()
                .map(|(abbr, mut indices)| {
                    indices.sort_unstable();
                    let joined: Vec<String> = indices.iter().map(u32::to_string).collect();
                    format!("{abbr} ({})", joined.join("/"))
                })
                .collect();
            format!("{function}: {}", entries.join(", "))
        })
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Family, Function, Species};
    use chrono::NaiveTime;

    fn bat(id: u32, function: &str) -> Protocol {
        Protocol::new(
            id,
            Species::new(1, "Gewone dwergvleermuis", Family::new(1, "Vleermuis"))
                .with_abbreviation("GD"),
            Function::new(id, function),
        )
    }

    #[test]
    fn test_relative_time_text() {
        assert_eq!(relative_time_text(PartOfDay::Morning, 0), "Zonsopkomst");
        assert_eq!(relative_time_text(PartOfDay::Evening, 10), "Zonsondergang");
        assert_eq!(
            relative_time_text(PartOfDay::Morning, -90),
            "1,5 uur voor zonsopkomst"
        );
        assert_eq!(relative_time_text(PartOfDay::Evening, 120), "2 uur na zonsondergang");
    }

    #[test]
    fn test_morning_start_from_end_and_duration() {
        let a = bat(1, "Kraamverblijfplaats")
            .with_end(TimingReference::Sunrise, Some(0))
            .with_duration_hours(2.0);
        let b = bat(2, "Zomerverblijfplaats")
            .with_end(TimingReference::Sunrise, Some(30))
            .with_duration_hours(1.0);
        let text = start_time_text(Some(PartOfDay::Morning), &[(&a, 1), (&b, 1)]);
        // Earliest end 30 min before sunrise, minus 120 min
        assert_eq!(text.as_deref(), Some("2,5 uur voor zonsopkomst"));
    }

    #[test]
    fn test_evening_start_and_daytime() {
        let a = bat(1, "Vliegroute").with_start(TimingReference::Sunset, Some(60));
        let b = bat(2, "Foerageergebied").with_start(TimingReference::Sunset, Some(-30));
        assert_eq!(
            start_time_text(Some(PartOfDay::Evening), &[(&a, 1), (&b, 1)]).as_deref(),
            Some("0,5 uur voor zonsondergang")
        );
        assert_eq!(
            start_time_text(Some(PartOfDay::Daytime), &[(&a, 1)]).as_deref(),
            Some("Overdag")
        );
        assert_eq!(start_time_text(None, &[(&a, 1)]), None);
    }

    #[test]
    fn test_absolute_start_wraps_past_midnight() {
        let a = bat(1, "Nest").with_absolute_start(NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        let b = bat(2, "Nest").with_absolute_start(NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        assert_eq!(
            start_time_text(Some(PartOfDay::Evening), &[(&a, 1), (&b, 1)]).as_deref(),
            Some("23:00")
        );
    }

    fn species_protocol(id: u32, abbr: &str, family: &str, function: &str) -> Protocol {
        Protocol::new(
            id,
            Species::new(id, abbr, Family::new(id, family)).with_abbreviation(abbr),
            Function::new(id, function),
        )
        .with_start(TimingReference::Sunset, Some(60))
    }

    #[test]
    fn test_butterfly_midday_text() {
        let iepenpage = species_protocol(1, "IP", "Vlinder", "Voortplantingsgebied")
            .with_start(TimingReference::Daytime, None);
        assert_eq!(
            start_time_text(Some(PartOfDay::Daytime), &[(&iepenpage, 1)]).as_deref(),
            Some(VLINDER_START_TEXT)
        );
    }

    #[test]
    fn test_hm_text_after_sunrise() {
        let hm = species_protocol(1, "HM", "Zwaluw", "Nest");
        let bat = bat(2, "Nest");
        assert_eq!(
            start_time_text(Some(PartOfDay::Morning), &[(&bat, 1), (&hm, 1)]).as_deref(),
            Some("1-2 uur na zonsopkomst")
        );
    }

    #[test]
    fn test_mv_mating_roost_texts() {
        let mv = species_protocol(1, "MV", "Vleermuis", "Paarverblijf");
        assert_eq!(
            start_time_text(Some(PartOfDay::Evening), &[(&mv, 2)]).as_deref(),
            Some("Zonsondergang")
        );
        assert_eq!(
            start_time_text(Some(PartOfDay::Morning), &[(&mv, 2)]).as_deref(),
            Some("3 uur voor zonsopgang")
        );
        // Other MV functions use the derived text
        let other = species_protocol(2, "MV", "Vleermuis", "Zomerverblijfplaats");
        assert_eq!(
            start_time_text(Some(PartOfDay::Evening), &[(&other, 1)]).as_deref(),
            Some("1 uur na zonsondergang")
        );
    }

    #[test]
    fn test_rd_mating_roost_first_visit_at_midnight() {
        let rd = species_protocol(1, "RD", "Vleermuis", "Paarverblijf");
        assert_eq!(
            start_time_text(Some(PartOfDay::Evening), &[(&rd, 1)]).as_deref(),
            Some("00:00")
        );
        assert_eq!(
            start_time_text(Some(PartOfDay::Evening), &[(&rd, 2)]).as_deref(),
            Some("1 uur na zonsondergang")
        );
    }

    #[test]
    fn test_precipitation_prefers_ranked() {
        let merged = merge_precipitation(["geen regen", "droog", "motregen"].into_iter());
        assert_eq!(merged.as_deref(), Some("droog"));
        let merged = merge_precipitation(["weinig wind", "geen hoosbui"].into_iter());
        assert_eq!(merged.as_deref(), Some("weinig wind"));
        assert_eq!(merge_precipitation(["  "].into_iter()), None);
    }

    #[test]
    fn test_planning_remarks_allowlist() {
        let remarks = planning_remarks(
            [
                "Bij voorkeur niet na (hevige) regenbuien. Duur 2 uur.",
                "Ten minste 1 ochtend",
            ]
            .into_iter(),
        );
        assert_eq!(
            remarks.as_deref(),
            Some("ten minste 1 ochtend | 1 ochtend | bij voorkeur niet na (hevige) regenbuien")
        );
        assert_eq!(planning_remarks(["Duur 2 uur"].into_iter()), None);
    }

    #[test]
    fn test_field_remarks_only_for_mixed_functions() {
        let a = bat(1, "Kraamverblijfplaats");
        let b = bat(2, "Zomerverblijfplaats");
        assert_eq!(field_remarks(&[(&a, 1)]), None);
        assert_eq!(
            field_remarks(&[(&b, 2), (&a, 1)]).as_deref(),
            Some("Kraamverblijfplaats: GD (1)\nZomerverblijfplaats: GD (2)")
        );
    }
}
