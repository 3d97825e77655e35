//! Error types.
//!
//! Only configuration and caller-contract problems are errors. Data-quality
//! issues in protocol input are reported as
//! [`GenerationWarning`](crate::validation::GenerationWarning)s and planning
//! shortfalls as [`SkipReason`](crate::planning::SkipReason)s.

use chrono::NaiveDate;
use thiserror::Error;

/// Result alias for fallible planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Errors raised by configuration loading and planning entry points.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Configuration value missing, malformed, or out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration text could not be parsed.
    #[error("Configuration parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A planning week must start on a Monday.
    #[error("Week must start on a Monday, got {0} ({weekday})", weekday = .0.format("%A"))]
    InvalidWeekStart(NaiveDate),
}
