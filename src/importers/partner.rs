use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::traits::ImporterTrait;
use super::types::ImportedAccommodation;
use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::models::{Amenities, ApartmentType, NewAccommodation, ResidenceType, Source, UnitStock};

pub const USER_AGENT: &str = concat!("student-housing/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client settings for every outbound call
pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Feeds come either bare or wrapped in a paging envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Feed {
    Wrapped {
        #[serde(alias = "items", alias = "data")]
        results: Vec<PartnerRecord>,
    },
    Bare(Vec<PartnerRecord>),
}

#[derive(Debug, Deserialize)]
struct PartnerOwner {
    name: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PartnerRecord {
    id: Value,
    name: String,
    description: Option<String>,
    #[serde(default)]
    address: String,
    #[serde(default)]
    city: String,
    #[serde(default, alias = "zip_code", alias = "postcode")]
    postal_code: String,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "type")]
    residence_type: Option<String>,
    owner: Option<PartnerOwner>,
    #[serde(default)]
    units: BTreeMap<String, UnitStock>,
    nb_total_apartments: Option<u32>,
    nb_accessible_apartments: Option<u32>,
    nb_coliving_apartments: Option<u32>,
    #[serde(default)]
    amenities: Amenities,
    #[serde(default, alias = "images")]
    images_urls: Vec<String>,
    #[serde(alias = "url")]
    external_url: Option<String>,
}

fn source_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl PartnerRecord {
    fn into_imported(self) -> Result<ImportedAccommodation> {
        let source_id = source_id(&self.id)
            .ok_or_else(|| Error::validation(format!("record '{}' has no usable id", self.name)))?;

        let point = match (self.lon, self.lat) {
            (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)?),
            _ => None,
        };

        let mut units = BTreeMap::new();
        for (key, stock) in self.units {
            match ApartmentType::from_key(&key) {
                Some(kind) => {
                    units.insert(kind, stock);
                }
                None => debug!("Ignoring unknown apartment type '{key}'"),
            }
        }

        let (owner_name, owner_url) = match self.owner {
            Some(owner) => (Some(owner.name), owner.url),
            None => (None, None),
        };

        Ok(ImportedAccommodation {
            source_id,
            owner_name,
            owner_url,
            accommodation: NewAccommodation {
                name: self.name,
                description: self.description,
                point,
                address: self.address,
                city: self.city,
                postal_code: self.postal_code,
                residence_type: self
                    .residence_type
                    .as_deref()
                    .map(ResidenceType::from_label)
                    .unwrap_or_default(),
                owner_id: None,
                units,
                nb_total_apartments: self.nb_total_apartments,
                nb_accessible_apartments: self.nb_accessible_apartments,
                nb_coliving_apartments: self.nb_coliving_apartments,
                amenities: self.amenities,
                images_urls: self.images_urls,
                external_url: self.external_url,
                published: true,
            },
        })
    }
}

/// JSON feed published by a partner (CROUS, CLEF, ARPEJ, iBAIL)
pub struct PartnerFeedImporter {
    client: Client,
    source: Source,
    url: String,
}

impl PartnerFeedImporter {
    pub fn new(source: Source, url: impl Into<String>) -> Result<Self> {
        if source == Source::Csv {
            return Err(Error::validation("csv is not a partner feed"));
        }

        Ok(Self {
            client: http_client()?,
            source,
            url: url.into(),
        })
    }

    /// Parses a feed body; malformed records are logged and dropped
    pub fn parse_feed(body: &str) -> Result<Vec<ImportedAccommodation>> {
        let records = match serde_json::from_str::<Feed>(body)? {
            Feed::Wrapped { results } => results,
            Feed::Bare(results) => results,
        };

        let mut imported = Vec::with_capacity(records.len());
        for record in records {
            match record.into_imported() {
                Ok(record) => imported.push(record),
                Err(e) => warn!("Skipping feed record: {e}"),
            }
        }
        Ok(imported)
    }
}

#[async_trait]
impl ImporterTrait for PartnerFeedImporter {
    async fn fetch(&self) -> Result<Vec<ImportedAccommodation>> {
        info!("Fetching {} feed", self.source);
        debug!("Fetching URL: {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            warn!("{} returned status: {}", self.source, response.status());
            return Err(Error::Import(format!(
                "{} feed returned {}",
                self.source,
                response.status()
            )));
        }

        let body = response.text().await?;
        debug!("Downloaded {} bytes", body.len());

        let records = Self::parse_feed(&body)?;
        info!("Fetched {} records from {}", records.len(), self.source);
        Ok(records)
    }

    fn source(&self) -> Source {
        self.source
    }
}
