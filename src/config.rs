//! Planner configuration.
//!
//! A single [`PlannerConfig`] value is built once by the host and handed to
//! both engines. Nothing in this crate reads process state on its own;
//! [`PlannerConfig::from_env`] is an explicit opt-in.
//!
//! # Sources
//!
//! 1. Compiled defaults ([`PlannerConfig::default`])
//! 2. TOML text ([`PlannerConfig::from_toml_str`]), every key optional
//! 3. Environment overrides ([`PlannerConfig::from_env`]):
//!    `MIN_EFFECTIVE_WINDOW_DAYS`, `VISIT_GEN_DEBUG`

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::models::PartOfDay;

/// Environment variable overriding [`PlannerConfig::min_effective_window_days`].
pub const ENV_MIN_EFFECTIVE_WINDOW_DAYS: &str = "MIN_EFFECTIVE_WINDOW_DAYS";
/// Environment variable enabling the verbose generation trace.
pub const ENV_DEBUG: &str = "VISIT_GEN_DEBUG";

/// Default minimum length (days) of a combined visit window.
pub const DEFAULT_MIN_EFFECTIVE_WINDOW_DAYS: i64 = 14;

/// Engine configuration shared by visit generation and weekly planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Minimum intersected window length (days) for a multi-protocol visit.
    pub min_effective_window_days: i64,
    /// Promotes the generation trace from `debug` to `info` level.
    pub debug: bool,
    /// Researcher-days held back per part of day.
    pub spare_capacity: SpareCapacity,
    /// Weights of the researcher score terms.
    pub score_weights: ScoreWeights,
    /// Normalized family names that are never bucketed with anything.
    pub solo_families: Vec<String>,
    /// Family pairs (normalized names) allowed to share a visit.
    pub cross_family_pairs: Vec<[String; 2]>,
}

/// Spare researcher-days reserved per part of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpareCapacity {
    pub morning: u32,
    pub daytime: u32,
    pub evening: u32,
}

/// Weights of the five researcher score terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Travel time band.
    pub travel: f64,
    /// Assigned visits / available capacity.
    pub workload: f64,
    /// Share of visits needing more than two researchers.
    pub large_team: f64,
    /// Share of bike visits.
    pub bike: f64,
    /// Share of this project's visits.
    pub project: f64,
}

impl Default for SpareCapacity {
    fn default() -> Self {
        Self {
            morning: 1,
            daytime: 2,
            evening: 2,
        }
    }
}

impl SpareCapacity {
    /// Reserve for one part of day.
    pub fn for_part(&self, part: PartOfDay) -> u32 {
        match part {
            PartOfDay::Morning => self.morning,
            PartOfDay::Daytime => self.daytime,
            PartOfDay::Evening => self.evening,
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            travel: 4.0,
            workload: 32.0,
            large_team: 3.0,
            bike: 1.0,
            project: 1.0,
        }
    }
}

impl ScoreWeights {
    fn as_array(&self) -> [f64; 5] {
        [
            self.travel,
            self.workload,
            self.large_team,
            self.bike,
            self.project,
        ]
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_effective_window_days: DEFAULT_MIN_EFFECTIVE_WINDOW_DAYS,
            debug: false,
            spare_capacity: SpareCapacity::default(),
            score_weights: ScoreWeights::default(),
            solo_families: vec!["pad".to_string()],
            cross_family_pairs: vec![["vleermuis".to_string(), "zwaluw".to_string()]],
        }
    }
}

impl PlannerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum effective window length (days).
    pub fn with_min_effective_window_days(mut self, days: i64) -> Self {
        self.min_effective_window_days = days;
        self
    }

    /// Enables or disables the verbose generation trace.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the spare capacity reserve.
    pub fn with_spare_capacity(mut self, spare: SpareCapacity) -> Self {
        self.spare_capacity = spare;
        self
    }

    /// Sets the researcher score weights.
    pub fn with_score_weights(mut self, weights: ScoreWeights) -> Self {
        self.score_weights = weights;
        self
    }

    /// Replaces the solo family list.
    pub fn with_solo_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.solo_families = families.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a cross-family pair.
    pub fn with_cross_family_pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.cross_family_pairs.push([a.into(), b.into()]);
        self
    }

    /// Parses TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through a lookup function.
    ///
    /// Keeps tests independent of the real environment.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().apply_env_with(lookup)
    }

    /// Applies environment overrides on top of `self`.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MIN_EFFECTIVE_WINDOW_DAYS) {
            self.min_effective_window_days = raw.trim().parse().map_err(|_| {
                PlannerError::Config(format!(
                    "{ENV_MIN_EFFECTIVE_WINDOW_DAYS} must be an integer, got '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_DEBUG) {
            self.debug = matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.min_effective_window_days < 0 {
            return Err(PlannerError::Config(format!(
                "min_effective_window_days must be >= 0, got {}",
                self.min_effective_window_days
            )));
        }
        if self
            .score_weights
            .as_array()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(PlannerError::Config(
                "score weights must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.min_effective_window_days, 14);
        assert!(!config.debug);
        assert_eq!(config.spare_capacity.for_part(PartOfDay::Evening), 2);
        assert_eq!(config.spare_capacity.for_part(PartOfDay::Morning), 1);
        assert_eq!(config.spare_capacity.for_part(PartOfDay::Daytime), 2);
        assert!((config.score_weights.workload - 32.0).abs() < 1e-10);
        assert_eq!(config.solo_families, vec!["pad".to_string()]);
    }

    #[test]
    fn test_builder() {
        let config = PlannerConfig::new()
            .with_min_effective_window_days(10)
            .with_debug(true)
            .with_solo_families(Vec::<String>::new())
            .with_cross_family_pair("zangvogel", "roofvogel");

        assert_eq!(config.min_effective_window_days, 10);
        assert!(config.debug);
        assert!(config.solo_families.is_empty());
        assert_eq!(config.cross_family_pairs.len(), 2);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = PlannerConfig::from_toml_str(
            r#"
            min_effective_window_days = 10

            [spare_capacity]
            evening = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.min_effective_window_days, 10);
        assert_eq!(config.spare_capacity.evening, 3);
        // Unspecified keys keep defaults
        assert_eq!(config.spare_capacity.morning, 1);
        assert!(!config.debug);
    }

    #[test]
    fn test_from_toml_rejects_negative_window() {
        let err = PlannerConfig::from_toml_str("min_effective_window_days = -1").unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        let err = PlannerConfig::from_toml_str("min_effective_window_days = [").unwrap_err();
        assert!(matches!(err, PlannerError::TomlParse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_MIN_EFFECTIVE_WINDOW_DAYS, " 21 "),
            (ENV_DEBUG, "Yes"),
        ]
        .into_iter()
        .collect();

        let config =
            PlannerConfig::from_env_with(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.min_effective_window_days, 21);
        assert!(config.debug);
    }

    #[test]
    fn test_env_bad_integer() {
        let err = PlannerConfig::from_env_with(|key| {
            (key == ENV_MIN_EFFECTIVE_WINDOW_DAYS).then(|| "two weeks".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("MIN_EFFECTIVE_WINDOW_DAYS"));
    }

    #[test]
    fn test_env_absent_keeps_defaults() {
        let config = PlannerConfig::from_env_with(|_| None).unwrap();
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let config = PlannerConfig::new().with_score_weights(ScoreWeights {
            travel: -1.0,
            ..ScoreWeights::default()
        });
        assert!(config.validate().is_err());
    }
}
