use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::extract::{ApiPath, ApiQuery};
use super::AppState;
use crate::config::MAX_PAGE_SIZE;
use crate::error::{Error, Result};
use crate::models::{Academy, City, Department};
use crate::search::{TerritorySearchResult, DEFAULT_LIMIT};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

pub async fn search_territories(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<TerritorySearchResult>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(Error::validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok(Json(state.territories.search(&params.q, limit)))
}

pub async fn list_academies(State(state): State<AppState>) -> Result<Json<Vec<Academy>>> {
    Ok(Json(state.db.list_academies().await?))
}

pub async fn academy_departments(
    State(state): State<AppState>,
    ApiPath(academy_id): ApiPath<i64>,
) -> Result<Json<Vec<Department>>> {
    let academy = state.db.get_academy(academy_id).await?;
    Ok(Json(state.db.list_departments(Some(academy.id)).await?))
}

pub async fn department_cities(
    State(state): State<AppState>,
    ApiPath(department_id): ApiPath<i64>,
) -> Result<Json<Vec<City>>> {
    let department = state.db.get_department(department_id).await?;
    Ok(Json(state.db.list_cities(Some(department.id)).await?))
}

pub async fn get_city(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<City>> {
    Ok(Json(state.db.get_city_by_slug(&slug).await?))
}
