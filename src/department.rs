//! Department enumeration
//!
//! Output files are routed into folder hierarchies by a single-character
//! department code embedded in the file name. The set of departments is
//! closed; unknown codes are rejected with a typed error at the parse site
//! rather than falling through to an "unclassified" destination.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A business department, identified by codes "1".."6"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Department {
    Grocery,
    Fresh,
    Perishables,
    NonFoods,
    HealthBeauty,
    Gms,
}

impl Department {
    /// All departments, in code order
    pub const ALL: [Department; 6] = [
        Department::Grocery,
        Department::Fresh,
        Department::Perishables,
        Department::NonFoods,
        Department::HealthBeauty,
        Department::Gms,
    ];

    /// Parse a department code
    pub fn from_code(code: &str) -> Option<Department> {
        match code {
            "1" => Some(Department::Grocery),
            "2" => Some(Department::Fresh),
            "3" => Some(Department::Perishables),
            "4" => Some(Department::NonFoods),
            "5" => Some(Department::HealthBeauty),
            "6" => Some(Department::Gms),
            _ => None,
        }
    }

    /// The single-character code for this department
    pub fn code(self) -> &'static str {
        match self {
            Department::Grocery => "1",
            Department::Fresh => "2",
            Department::Perishables => "3",
            Department::NonFoods => "4",
            Department::HealthBeauty => "5",
            Department::Gms => "6",
        }
    }

    /// The default display name, used as a folder segment in both destinations
    pub fn default_display_name(self) -> &'static str {
        match self {
            Department::Grocery => "1 - GROCERY",
            Department::Fresh => "2 - FRESH",
            Department::Perishables => "3 - PERISHABLES",
            Department::NonFoods => "4 - NON FOODS",
            Department::HealthBeauty => "5 - HEALTH & BEAUTY",
            Department::Gms => "6 - GMS",
        }
    }
}

/// Code-to-display-name table, with optional overrides from configuration
#[derive(Debug, Clone)]
pub struct DepartmentTable {
    names: BTreeMap<Department, String>,
}

impl Default for DepartmentTable {
    fn default() -> Self {
        let names = Department::ALL
            .iter()
            .map(|d| (*d, d.default_display_name().to_string()))
            .collect();
        Self { names }
    }
}

impl DepartmentTable {
    /// Build a table with display-name overrides keyed by department code.
    ///
    /// Overrides may cover any subset of the known codes; an entry for an
    /// unknown code is a configuration error.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut table = Self::default();
        for (code, name) in overrides {
            let dept = Department::from_code(code).ok_or_else(|| {
                Error::invalid_value("departments", format!("unknown department code '{code}'"))
            })?;
            table.names.insert(dept, name.clone());
        }
        Ok(table)
    }

    /// Display name for a department
    pub fn display_name(&self, dept: Department) -> &str {
        &self.names[&dept]
    }
}
