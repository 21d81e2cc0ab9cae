use serde::Serialize;

use crate::models::Accommodation;

// Stand-ins for absent fields so they never win LEAST / GREATEST
const LEAST_SENTINEL: u32 = u32::MAX;
const GREATEST_SENTINEL: u32 = 0;

/// A price is advertised only when it is set and strictly positive
fn present(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

/// Lowest advertised price across the sixteen price fields
pub fn min_price(accommodation: &Accommodation) -> Option<u32> {
    let least = accommodation
        .price_fields()
        .into_iter()
        .map(|field| present(field).unwrap_or(LEAST_SENTINEL))
        .min()
        .unwrap_or(LEAST_SENTINEL);
    (least != LEAST_SENTINEL).then_some(least)
}

/// Highest advertised price across the sixteen price fields
pub fn max_price(accommodation: &Accommodation) -> Option<u32> {
    let greatest = accommodation
        .price_fields()
        .into_iter()
        .map(|field| present(field).unwrap_or(GREATEST_SENTINEL))
        .max()
        .unwrap_or(GREATEST_SENTINEL);
    (greatest != GREATEST_SENTINEL).then_some(greatest)
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PriceBounds {
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
}

/// Global bounds; listings without any advertised price are ignored
pub fn price_bounds<'a, I>(accommodations: I) -> PriceBounds
where
    I: IntoIterator<Item = &'a Accommodation>,
{
    accommodations
        .into_iter()
        .filter_map(|acc| Some((min_price(acc)?, max_price(acc)?)))
        .fold(PriceBounds::default(), |bounds, (low, high)| PriceBounds {
            min_price: Some(bounds.min_price.map_or(low, |m| m.min(low))),
            max_price: Some(bounds.max_price.map_or(high, |m| m.max(high))),
        })
}
