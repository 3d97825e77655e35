//! Survey scheduling domain models.
//!
//! Provides the data types shared by visit generation and weekly planning.
//! Catalog records (families, species, functions) and protocols are
//! read-only inputs; visits are produced by the generation engine and read
//! back by the planner.
//!
//! # Domain Mappings
//!
//! | survey-schedule | Role |
//! |-----------------|------|
//! | Protocol | Regulatory template per species/function |
//! | ProtocolVisitWindow | Dated window of one required occurrence |
//! | Visit | Concrete survey event covering one or more occurrences |
//! | Researcher | Person assigned to visits |

mod part_of_day;
mod protocol;
mod researcher;
mod taxonomy;
mod visit;
mod window;

pub use part_of_day::{intersect_parts, part_allowed, parts_compatible, PartOfDay, PartSet};
pub use protocol::{MinPeriod, PeriodUnit, Protocol, ProtocolId, ProtocolVisitWindow, TimingReference};
pub use researcher::{Capability, Researcher, ResearcherId, ResearcherLoad, WeeklyAvailability};
pub use taxonomy::{
    normalize_family_name, Family, FamilyId, Function, FunctionId, Species, SpeciesId,
    DEFAULT_FAMILY_PRIORITY,
};
pub use visit::{FieldRequirements, ProtocolOccurrence, Visit, VisitFlags, VisitId};
pub use window::{shift_date_to_year, DateWindow};
