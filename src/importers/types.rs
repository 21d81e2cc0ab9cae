use serde::{Deserialize, Serialize};

use crate::models::NewAccommodation;

/// One record as read from a partner feed or CSV file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportedAccommodation {
    /// Identifier of the listing in the partner system
    pub source_id: String,
    pub owner_name: Option<String>,
    pub owner_url: Option<String>,
    pub accommodation: NewAccommodation,
}

impl ImportedAccommodation {
    /// Address line sent to the geocoder
    pub fn full_address(&self) -> String {
        let acc = &self.accommodation;
        [acc.address.as_str(), acc.postal_code.as_str(), acc.city.as_str()]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of one import run
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}
