use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geo::{GeoPoint, Polygon};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Academy {
    pub id: i64,
    pub name: String,
}

/// Every department belongs to exactly one academy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub academy_id: i64,
}

/// Every city belongs to exactly one department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub postal_codes: Vec<String>,
    pub department_id: i64,
    pub center: Option<GeoPoint>,
    pub boundary: Option<Polygon>,
    pub population: Option<u32>,
    pub popular: bool,
}

impl City {
    /// Boundary containment when a boundary is known, postal code otherwise
    pub fn covers(&self, point: Option<&GeoPoint>, postal_code: &str) -> bool {
        match (&self.boundary, point) {
            (Some(boundary), Some(point)) => boundary.contains(point),
            _ => self.postal_codes.iter().any(|code| code == postal_code),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryKind {
    Academy,
    Department,
    City,
}

impl TerritoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerritoryKind::Academy => "academy",
            TerritoryKind::Department => "department",
            TerritoryKind::City => "city",
        }
    }
}

impl fmt::Display for TerritoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerritoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "academy" => Ok(TerritoryKind::Academy),
            "department" => Ok(TerritoryKind::Department),
            "city" => Ok(TerritoryKind::City),
            other => Err(Error::validation(format!("unknown territory type '{other}'"))),
        }
    }
}

/// Pointer to any territory entity, used to scope alerts and FAQ entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TerritoryRef {
    pub kind: TerritoryKind,
    pub id: i64,
}
