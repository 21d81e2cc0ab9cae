use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::partner::http_client;
use crate::error::{Error, Result};
use crate::geo::GeoPoint;

/// Resolves a postal address to a point
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint>;
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// GeoJSON order: `[lon, lat]`
    coordinates: [f64; 2],
}

/// French national address API (`/search/?q=...&limit=1`)
pub struct BanGeocoder {
    client: Client,
    base_url: String,
}

impl BanGeocoder {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// First feature of a GeoJSON response
    pub fn parse_response(address: &str, body: &str) -> Result<GeoPoint> {
        let collection: FeatureCollection = serde_json::from_str(body)?;
        let [lon, lat] = collection
            .features
            .first()
            .map(|feature| feature.geometry.coordinates)
            .ok_or_else(|| Error::Geocoding(format!("no result for '{address}'")))?;
        GeoPoint::new(lon, lat).map_err(|e| Error::Geocoding(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for BanGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint> {
        if address.trim().is_empty() {
            return Err(Error::Geocoding("empty address".into()));
        }

        let response = self
            .client
            .get(format!("{}/search/", self.base_url))
            .query(&[("q", address), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Geocoding(format!(
                "geocoder returned {} for '{address}'",
                response.status()
            )));
        }

        let body = response.text().await?;
        let point = Self::parse_response(address, &body)?;
        debug!("Geocoded '{address}' to {},{}", point.lon, point.lat);
        Ok(point)
    }
}
