use axum::extract::State;
use axum::Json;

use super::extract::{ApiPath, ApiQuery};
use super::AppState;
use crate::error::Result;
use crate::listing::{AccommodationView, ListingQuery, Page, PriceBounds};

pub async fn list_accommodations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListingQuery>,
) -> Result<Json<Page<AccommodationView>>> {
    Ok(Json(state.listings.search(&query).await?))
}

pub async fn accommodation_prices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListingQuery>,
) -> Result<Json<PriceBounds>> {
    Ok(Json(state.listings.price_bounds(&query).await?))
}

pub async fn get_accommodation(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<AccommodationView>> {
    Ok(Json(state.listings.get(&slug).await?))
}
