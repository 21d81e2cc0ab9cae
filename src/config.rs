use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

use crate::error::{Error, Result};

pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub database: String,
    pub db_max_connections: u32,
    pub geocoder_url: String,
    pub stats_url: Option<String>,
    pub stats_token: Option<String>,
    pub stats_site_id: u32,
    pub page_size: usize,
    pub cors_max_age_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            database: "housing.db".to_string(),
            db_max_connections: 5,
            geocoder_url: "https://api-adresse.data.gouv.fr".to_string(),
            stats_url: None,
            stats_token: None,
            stats_site_id: 1,
            page_size: 30,
            cors_max_age_secs: 60 * 60,
        }
    }
}

impl Config {
    /// Loads the configuration from the environment, `.env` included
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        let defaults = Self::default();
        let page_size: usize = try_load("HOUSING_PAGE_SIZE", defaults.page_size)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "HOUSING_PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(Self {
            bind: try_load("HOUSING_BIND", defaults.bind)?,
            database: try_load("HOUSING_DATABASE", defaults.database)?,
            db_max_connections: try_load("HOUSING_DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            geocoder_url: try_load("HOUSING_GEOCODER_URL", defaults.geocoder_url)?,
            stats_url: var("HOUSING_STATS_URL"),
            stats_token: var("HOUSING_STATS_TOKEN").or_else(|| read_secret("HOUSING_STATS_TOKEN")),
            stats_site_id: try_load("HOUSING_STATS_SITE_ID", defaults.stats_site_id)?,
            page_size,
            cors_max_age_secs: try_load("HOUSING_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs)?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            Error::Config(format!("invalid {key}: {e}"))
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret file: {e}");
        })
        .ok()
}
