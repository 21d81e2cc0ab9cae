use std::cmp::Ordering;

use serde::Serialize;

use super::prices::min_price;
use crate::models::Accommodation;

/// Availability buckets in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unknown,
    Full,
}

impl Availability {
    pub fn of(accommodation: &Accommodation) -> Self {
        match accommodation.available_units() {
            Some(n) if n > 0 => Availability::Available,
            Some(_) => Availability::Full,
            None => Availability::Unknown,
        }
    }
}

/// Availability first, then priced before unpriced, cheapest first, then name
pub fn availability_first(a: &Accommodation, b: &Accommodation) -> Ordering {
    let (price_a, price_b) = (min_price(a), min_price(b));

    Availability::of(a)
        .cmp(&Availability::of(b))
        .then_with(|| price_a.is_none().cmp(&price_b.is_none()))
        .then_with(|| price_a.cmp(&price_b))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_availability_first(accommodations: &mut [Accommodation]) {
    accommodations.sort_by(availability_first);
}
