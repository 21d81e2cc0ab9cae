//! Domain data model: listings, territories, accounts and content.

mod accommodation;
mod account;
mod content;
mod territory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use accommodation::{
    Accommodation, AccommodationPatch, Amenities, ApartmentType, NewAccommodation, ResidenceType,
    UnitStock,
};
pub use account::{AccommodationAlert, NewAlert, NewStudent, Owner, Student};
pub use content::{EventStats, NewQuestionAnswer, QuestionAnswer, Stats, StatsPeriod};
pub use territory::{Academy, City, Department, TerritoryKind, TerritoryRef};

/// Partner system a listing was imported from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Crous,
    Clef,
    Arpej,
    Ibail,
    Csv,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Crous,
        Source::Clef,
        Source::Arpej,
        Source::Ibail,
        Source::Csv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Crous => "crous",
            Source::Clef => "clef",
            Source::Arpej => "arpej",
            Source::Ibail => "ibail",
            Source::Csv => "csv",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == lowered)
            .ok_or_else(|| Error::validation(format!("unknown source '{s}'")))
    }
}

/// Dedup key linking a listing to its identifier in a partner system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalSource {
    pub accommodation_id: i64,
    pub source: Source,
    pub source_id: String,
}
