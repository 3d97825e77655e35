//! Field survey scheduling for ecological consultancies.
//!
//! Two engines share one domain model:
//!
//! - **Visit generation** turns the regulatory survey protocols selected for
//!   a project into the smallest practical set of dated field visits,
//!   combining protocols whose windows, parts of day and species rules
//!   allow it.
//! - **Weekly planning** picks the visits to staff in a given week under
//!   part-of-day capacity and ranks qualified researchers for each.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Protocol`, `Visit`, `Researcher`,
//!   `DateWindow`, `PartOfDay`, taxonomy records
//! - **`compatibility`**: Rule table deciding which protocol occurrences
//!   may share a visit
//! - **`generation`**: `VisitGenerator` pipeline
//! - **`planning`**: `WeeklyPlanner`, capacity, qualification, scoring
//! - **`validation`**: Protocol input checks reported as warnings
//! - **`config`**: `PlannerConfig` (TOML, environment, builders)
//!
//! # Architecture
//!
//! Both engines are pure: they read their inputs and a [`config::PlannerConfig`]
//! value and return result records. Persistence, routing services and
//! subscribers for the `tracing` output belong to the host.

pub mod compatibility;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod planning;
pub mod validation;

pub use error::{PlannerError, Result};
