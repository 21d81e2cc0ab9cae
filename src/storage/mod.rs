//! Storage layer - SQLite through sqlx
//!
//! # Architecture
//!
//! - `database`: pool management and initialization
//! - `migrations`: schema versioning
//! - one file per aggregate (`accommodations`, `owners`, `territories`,
//!   `accounts`, `content`), each adding methods to [`Database`]
//!
//! Nested values (unit stocks, amenities, postal codes, boundaries) are stored
//! as JSON text columns.

mod accommodations;
mod accounts;
mod content;
pub mod database;
pub mod migrations;
mod owners;
mod territories;

pub use database::{Database, DatabaseConfig};
pub use migrations::{MigrationStatus, CURRENT_VERSION};
pub use territories::{TerritoryFile, TerritoryLoadSummary};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::Result;
use crate::geo::GeoPoint;

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

pub(crate) fn opt_u32(row: &SqliteRow, column: &str) -> Result<Option<u32>> {
    let value: Option<i64> = row.try_get(column)?;
    Ok(value.map(|v| u32::try_from(v.max(0)).unwrap_or(u32::MAX)))
}

pub(crate) fn point_from_row(row: &SqliteRow) -> Result<Option<GeoPoint>> {
    let lon: Option<f64> = row.try_get("lon")?;
    let lat: Option<f64> = row.try_get("lat")?;
    Ok(lon.zip(lat).map(|(lon, lat)| GeoPoint { lon, lat }))
}

#[cfg(test)]
mod tests;
