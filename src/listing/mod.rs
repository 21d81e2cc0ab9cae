//! Accommodation listing
//!
//! Filtering, price aggregation and ordering of published listings.
//!
//! ## Overview
//! Every filter is an independent predicate over an [`Accommodation`]; the
//! service loads published listings, keeps those matching every predicate,
//! orders them availability-first and pages the result. Price bounds reuse the
//! same filter minus its price ceiling.
//!
//! ## Submodules
//! - **`filters`**: query parsing/validation and the predicates.
//! - **`prices`**: per-listing min/max and global bounds over the sixteen price fields.
//! - **`ordering`**: the availability-first sort.
//! - **`service`**: storage-backed entry points used by the API.

pub mod filters;
pub mod ordering;
pub mod prices;
pub mod service;

use serde::Serialize;

use crate::config::MAX_PAGE_SIZE;
use crate::error::{Error, Result};
use crate::models::Accommodation;

pub use filters::{AccommodationFilter, ListingQuery, TerritoryRequest, TerritoryScope};
pub use ordering::{sort_availability_first, Availability};
pub use prices::{max_price, min_price, price_bounds, PriceBounds};
pub use service::ListingService;

/// Listing as exposed by the API, with its computed fields
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccommodationView {
    #[serde(flatten)]
    pub accommodation: Accommodation,
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
    pub available_units: Option<u32>,
    pub availability: Availability,
}

impl From<Accommodation> for AccommodationView {
    fn from(accommodation: Accommodation) -> Self {
        Self {
            min_price: min_price(&accommodation),
            max_price: max_price(&accommodation),
            available_units: accommodation.available_units(),
            availability: Availability::of(&accommodation),
            accommodation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: Option<usize>, page_size: Option<usize>, default_size: usize) -> Result<Self> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(default_size);
        if page == 0 {
            return Err(Error::validation("page starts at 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, page_size })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}

/// Pages past the end are empty, not an error
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let count = items.len();
    let results = items
        .into_iter()
        .skip((request.page - 1).saturating_mul(request.page_size))
        .take(request.page_size)
        .collect();

    Page {
        count,
        page: request.page,
        page_size: request.page_size,
        results,
    }
}

#[cfg(test)]
mod tests;
