use serde::Deserialize;

use super::prices::min_price;
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, GeoPoint};
use crate::models::{Accommodation, City};

pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Raw query string of the listing endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub bbox: Option<String>,
    pub center: Option<String>,
    pub radius: Option<String>,
    pub is_accessible: Option<String>,
    pub has_coliving: Option<String>,
    pub price_max: Option<String>,
    pub only_with_availability: Option<String>,
    /// Academy id
    pub academy: Option<i64>,
    /// Department code
    pub department: Option<String>,
    /// City slug
    pub city: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Territory named in the query, resolved against storage by the service
#[derive(Debug, Clone, PartialEq)]
pub enum TerritoryRequest {
    Academy(i64),
    Department(String),
    City(String),
}

/// Resolved territory constraint
#[derive(Debug, Clone, PartialEq)]
pub enum TerritoryScope {
    City(City),
    /// Postal code prefixes of one or more departments
    Departments(Vec<String>),
}

impl TerritoryScope {
    pub fn from_department_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        TerritoryScope::Departments(
            codes
                .into_iter()
                .map(|code| postal_prefix(code.as_ref()))
                .collect(),
        )
    }

    fn matches(&self, accommodation: &Accommodation) -> bool {
        match self {
            TerritoryScope::City(city) => {
                city.covers(accommodation.point.as_ref(), &accommodation.postal_code)
            }
            TerritoryScope::Departments(prefixes) => prefixes
                .iter()
                .any(|prefix| accommodation.postal_code.starts_with(prefix.as_str())),
        }
    }
}

/// Corsican departments (2A, 2B) share the `20` postal prefix
fn postal_prefix(code: &str) -> String {
    let code = code.trim().to_uppercase();
    if code == "2A" || code == "2B" {
        "20".to_string()
    } else {
        code
    }
}

/// Independent predicates, all of which must hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccommodationFilter {
    pub bbox: Option<BoundingBox>,
    pub radius: Option<(GeoPoint, f64)>,
    pub is_accessible: bool,
    pub has_coliving: bool,
    pub price_max: Option<u32>,
    pub only_with_availability: bool,
    pub territory: Option<TerritoryScope>,
}

impl AccommodationFilter {
    /// Validates the raw query; the territory part is returned unresolved
    pub fn parse(query: &ListingQuery) -> Result<(Self, Option<TerritoryRequest>)> {
        let bbox = query.bbox.as_deref().map(BoundingBox::parse).transpose()?;

        let radius = match (&query.center, &query.radius) {
            (Some(center), radius) => {
                let center = GeoPoint::parse_center(center)?;
                let km = match radius {
                    Some(raw) => parse_radius(raw)?,
                    None => DEFAULT_RADIUS_KM,
                };
                Some((center, km))
            }
            (None, Some(_)) => return Err(Error::validation("radius requires a center")),
            (None, None) => None,
        };

        let price_max = query
            .price_max
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| Error::validation(format!("invalid price_max '{raw}'")))
            })
            .transpose()?;

        let territory = if let Some(slug) = &query.city {
            Some(TerritoryRequest::City(slug.clone()))
        } else if let Some(code) = &query.department {
            Some(TerritoryRequest::Department(code.clone()))
        } else {
            query.academy.map(TerritoryRequest::Academy)
        };

        let filter = Self {
            bbox,
            radius,
            is_accessible: parse_flag(query.is_accessible.as_deref(), "is_accessible")?,
            has_coliving: parse_flag(query.has_coliving.as_deref(), "has_coliving")?,
            price_max,
            only_with_availability: parse_flag(
                query.only_with_availability.as_deref(),
                "only_with_availability",
            )?,
            territory: None,
        };

        Ok((filter, territory))
    }

    /// Same filter without the price ceiling, for computing price bounds
    pub fn without_price(&self) -> Self {
        Self {
            price_max: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, acc: &Accommodation) -> bool {
        if !acc.published {
            return false;
        }

        if let Some(bbox) = &self.bbox {
            if !acc.point.is_some_and(|p| bbox.contains(&p)) {
                return false;
            }
        }

        if let Some((center, km)) = &self.radius {
            if !acc.point.is_some_and(|p| p.distance_km(center) <= *km) {
                return false;
            }
        }

        if self.is_accessible && !acc.nb_accessible_apartments.is_some_and(|n| n > 0) {
            return false;
        }

        if self.has_coliving && !acc.nb_coliving_apartments.is_some_and(|n| n > 0) {
            return false;
        }

        if let Some(ceiling) = self.price_max {
            if !min_price(acc).is_some_and(|price| price <= ceiling) {
                return false;
            }
        }

        if self.only_with_availability && !acc.available_units().is_some_and(|n| n > 0) {
            return false;
        }

        self.territory.as_ref().map_or(true, |scope| scope.matches(acc))
    }

    pub fn apply(&self, accommodations: Vec<Accommodation>) -> Vec<Accommodation> {
        accommodations.into_iter().filter(|acc| self.matches(acc)).collect()
    }
}

fn parse_radius(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|km| km.is_finite() && *km > 0.0)
        .ok_or_else(|| Error::validation(format!("invalid radius '{raw}'")))
}

fn parse_flag(raw: Option<&str>, name: &str) -> Result<bool> {
    match raw.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(Error::validation(format!("invalid {name} value '{other}'"))),
    }
}
