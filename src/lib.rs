//! Backend of a student-housing discovery platform.
//!
//! # Layout
//! - [`models`]: listings, territories, accounts and content
//! - [`search`]: accent-insensitive fuzzy territory search
//! - [`listing`]: accommodation filters, price bounds and availability-first ordering
//! - [`storage`]: SQLite persistence through sqlx
//! - [`importers`]: CSV and partner feeds, geocoding, CSV export
//! - [`analytics`]: audience statistics snapshots
//! - [`api`]: the axum HTTP API
//!
//! Configuration comes from `HOUSING_*` environment variables, see [`config::Config`].

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod importers;
pub mod listing;
pub mod models;
pub mod search;
pub mod storage;

pub use error::{Error, Result};
