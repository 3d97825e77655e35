//! Species, family and function references.
//!
//! Static catalog content owned by the host. The engines only read names,
//! abbreviations and family priorities from these records.

use serde::{Deserialize, Serialize};

/// Family identifier.
pub type FamilyId = u32;
/// Species identifier.
pub type SpeciesId = u32;
/// Function identifier.
pub type FunctionId = u32;

/// Default family priority (lower = more urgent).
pub const DEFAULT_FAMILY_PRIORITY: i32 = 5;

/// Taxonomic family (e.g. "Vleermuis", "Zwaluw").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    /// Planning priority; values <= 3 are planned first.
    pub priority: i32,
}

/// A species and its family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
    /// Short code such as "GD" or "BoV".
    pub abbreviation: Option<String>,
    pub family: Family,
}

/// Survey function (purpose), e.g. "Kraamverblijfplaats".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
}

impl Family {
    /// Creates a family with default priority.
    pub fn new(id: FamilyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            priority: DEFAULT_FAMILY_PRIORITY,
        }
    }

    /// Sets the planning priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Normalized lookup key, see [`normalize_family_name`].
    pub fn key(&self) -> String {
        normalize_family_name(&self.name)
    }
}

impl Species {
    /// Creates a species.
    pub fn new(id: SpeciesId, name: impl Into<String>, family: Family) -> Self {
        Self {
            id,
            name: name.into(),
            abbreviation: None,
            family,
        }
    }

    /// Sets the abbreviation.
    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    /// Abbreviation, falling back to the full name.
    pub fn short_name(&self) -> &str {
        self.abbreviation.as_deref().unwrap_or(&self.name)
    }
}

impl Function {
    /// Creates a function.
    pub fn new(id: FunctionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// "SMP" (species management plan) functions.
    pub fn is_smp(&self) -> bool {
        self.name.trim_start().to_uppercase().starts_with("SMP")
    }
}

/// Collapses family name variants to one key.
///
/// Case-insensitive; "Vleermuizen" and "Vleermuis" both map to `vleermuis`,
/// any name containing "zwaluw" maps to `zwaluw`.
pub fn normalize_family_name(name: &str) -> String {
    let n = name.trim().to_lowercase();
    if n.contains("vleer") {
        "vleermuis".to_string()
    } else if n.contains("zwaluw") {
        "zwaluw".to_string()
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_family_name() {
        assert_eq!(normalize_family_name("Vleermuizen"), "vleermuis");
        assert_eq!(normalize_family_name(" Vleermuis "), "vleermuis");
        assert_eq!(normalize_family_name("Zwaluwen"), "zwaluw");
        assert_eq!(normalize_family_name("Roofvogel"), "roofvogel");
        assert_eq!(normalize_family_name(""), "");
    }

    #[test]
    fn test_smp_function() {
        assert!(Function::new(1, "SMP Kraamverblijf").is_smp());
        assert!(Function::new(1, "  smp nest").is_smp());
        assert!(!Function::new(1, "Kraamverblijfplaats").is_smp());
    }

    #[test]
    fn test_species_short_name() {
        let fam = Family::new(1, "Vleermuis").with_priority(2);
        let sp = Species::new(10, "Gewone dwergvleermuis", fam.clone());
        assert_eq!(sp.short_name(), "Gewone dwergvleermuis");
        let sp = sp.with_abbreviation("GD");
        assert_eq!(sp.short_name(), "GD");
        assert_eq!(fam.priority, 2);
        assert_eq!(fam.key(), "vleermuis");
    }
}
