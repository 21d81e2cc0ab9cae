use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use csv::ReaderBuilder;
use tracing::{debug, info, warn};

use super::traits::ImporterTrait;
use super::types::ImportedAccommodation;
use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::models::{Amenities, ApartmentType, NewAccommodation, ResidenceType, Source, UnitStock};

/// Listing columns shared by the CSV importer and the CSV export
pub const BASE_COLUMNS: [&str; 16] = [
    "source_id",
    "name",
    "description",
    "address",
    "city",
    "postal_code",
    "lon",
    "lat",
    "residence_type",
    "owner_name",
    "owner_url",
    "nb_total_apartments",
    "nb_accessible_apartments",
    "nb_coliving_apartments",
    "external_url",
    "images_urls",
];

pub const AMENITY_FLAGS: [&str; 10] = [
    "laundry_room",
    "common_areas",
    "bike_storage",
    "parking",
    "secure_access",
    "residence_manager",
    "desk",
    "cooking_plates",
    "microwave",
    "refrigerator",
];

pub const UNIT_FIELDS: [&str; 4] = ["total", "available", "price_min", "price_max"];

/// Separator for multi-valued cells such as image URLs
pub const LIST_SEPARATOR: char = '|';

/// Full header: base columns, amenities, then `<type>_<field>` per apartment type
pub fn columns() -> Vec<String> {
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(AMENITY_FLAGS.iter().map(|c| c.to_string()));
    columns.push("kitchen_type".into());
    columns.push("bathroom".into());
    for kind in ApartmentType::ALL {
        for field in UNIT_FIELDS {
            columns.push(format!("{}_{field}", kind.as_str()));
        }
    }
    columns
}

/// `;` when the header has more of them than commas, `,` otherwise
pub fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Local CSV file of listings, one row per residence
pub struct CsvImporter {
    path: PathBuf,
    source: Source,
}

impl CsvImporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_source(path, Source::Csv)
    }

    /// Partners that ship CSV dumps keep their own dedup namespace
    pub fn with_source(path: impl Into<PathBuf>, source: Source) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// Parses CSV content; rows that cannot be read are logged and dropped
    pub fn parse(content: &str) -> Result<Vec<ImportedAccommodation>> {
        let delimiter = detect_delimiter(content);
        debug!("Using delimiter '{}'", delimiter as char);

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.clone();
        if !headers.iter().any(|h| h == "source_id") || !headers.iter().any(|h| h == "name") {
            return Err(Error::Import(
                "CSV header must contain 'source_id' and 'name'".into(),
            ));
        }

        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<HashMap<String, String>>().enumerate() {
            // header is line 1
            let line = index + 2;
            let parsed = row
                .map_err(Error::from)
                .and_then(|row| Row(row).into_record());
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping CSV line {line}: {e}"),
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl ImporterTrait for CsvImporter {
    async fn fetch(&self) -> Result<Vec<ImportedAccommodation>> {
        info!("Reading {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records = Self::parse(content.trim_start_matches('\u{feff}'))?;
        info!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn source(&self) -> Source {
        self.source
    }
}

struct Row(HashMap<String, String>);

impl Row {
    fn text(&self, column: &str) -> Option<String> {
        self.0
            .get(column)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn number<T: FromStr>(&self, column: &str) -> Result<Option<T>> {
        // French exports use decimal commas and spaced thousands
        self.text(column)
            .map(|raw| {
                raw.replace(',', ".")
                    .replace([' ', '\u{a0}'], "")
                    .parse::<T>()
                    .map_err(|_| Error::validation(format!("invalid {column} '{raw}'")))
            })
            .transpose()
    }

    /// Whole amount; decimal rents are rounded to the nearest euro
    fn amount(&self, column: &str) -> Result<Option<u32>> {
        Ok(self
            .number::<f64>(column)?
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value.round() as u32))
    }

    fn flag(&self, column: &str) -> bool {
        matches!(
            self.text(column).map(|v| v.to_lowercase()).as_deref(),
            Some("1" | "true" | "oui" | "yes" | "x")
        )
    }

    fn into_record(self) -> Result<ImportedAccommodation> {
        let source_id = self
            .text("source_id")
            .ok_or_else(|| Error::validation("missing source_id"))?;
        let name = self
            .text("name")
            .ok_or_else(|| Error::validation("missing name"))?;

        let point = match (self.number::<f64>("lon")?, self.number::<f64>("lat")?) {
            (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)?),
            _ => None,
        };

        let mut units = std::collections::BTreeMap::new();
        for kind in ApartmentType::ALL {
            let key = kind.as_str();
            let stock = UnitStock {
                total: self.amount(&format!("{key}_total"))?,
                available: self.amount(&format!("{key}_available"))?,
                price_min: self.amount(&format!("{key}_price_min"))?,
                price_max: self.amount(&format!("{key}_price_max"))?,
            };
            if stock != UnitStock::default() {
                units.insert(kind, stock);
            }
        }

        let amenities = Amenities {
            laundry_room: self.flag("laundry_room"),
            common_areas: self.flag("common_areas"),
            bike_storage: self.flag("bike_storage"),
            parking: self.flag("parking"),
            secure_access: self.flag("secure_access"),
            residence_manager: self.flag("residence_manager"),
            kitchen_type: self.text("kitchen_type"),
            desk: self.flag("desk"),
            cooking_plates: self.flag("cooking_plates"),
            microwave: self.flag("microwave"),
            refrigerator: self.flag("refrigerator"),
            bathroom: self.text("bathroom"),
        };

        let images_urls = self
            .text("images_urls")
            .map(|cell| {
                cell.split(LIST_SEPARATOR)
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ImportedAccommodation {
            source_id,
            owner_name: self.text("owner_name"),
            owner_url: self.text("owner_url"),
            accommodation: NewAccommodation {
                name,
                description: self.text("description"),
                point,
                address: self.text("address").unwrap_or_default(),
                city: self.text("city").unwrap_or_default(),
                postal_code: self.text("postal_code").unwrap_or_default(),
                residence_type: self
                    .text("residence_type")
                    .map(|label| ResidenceType::from_label(&label))
                    .unwrap_or_default(),
                owner_id: None,
                units,
                nb_total_apartments: self.amount("nb_total_apartments")?,
                nb_accessible_apartments: self.amount("nb_accessible_apartments")?,
                nb_coliving_apartments: self.amount("nb_coliving_apartments")?,
                amenities,
                images_urls,
                external_url: self.text("external_url"),
                published: true,
            },
        })
    }
}
