//! Audience statistics pulled from a Matomo-compatible analytics API

use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::importers::partner::http_client;
use crate::models::{EventStats, Stats, StatsPeriod};
use crate::storage::Database;

pub struct StatsClient {
    client: Client,
    base_url: String,
    token: String,
    site_id: u32,
}

/// `date` parameter: a single day for calendar periods, `from,to` for ranges
fn date_param(period: StatsPeriod, from: NaiveDate, to: NaiveDate) -> String {
    match period {
        StatsPeriod::Range => format!("{from},{to}"),
        _ => from.to_string(),
    }
}

fn number(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0).round() as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Bounce rate as a fraction; the API reports it as `"42%"`
fn rate(value: Option<&Value>) -> f64 {
    let percent = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    percent / 100.0
}

fn check_api_error(body: &Value) -> Result<()> {
    if body.get("result").and_then(Value::as_str) == Some("error") {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(Error::Import(format!("analytics API: {message}")));
    }
    Ok(())
}

/// `VisitsSummary.get` response; an empty array means no visits
pub fn parse_visits(body: &str, period: StatsPeriod, from: NaiveDate, to: NaiveDate) -> Result<Stats> {
    let body: Value = serde_json::from_str(body)?;
    check_api_error(&body)?;

    Ok(Stats {
        period,
        date_from: from,
        date_to: to,
        unique_visitors: number(body.get("nb_uniq_visitors")),
        visits: number(body.get("nb_visits")),
        average_duration_secs: number(body.get("avg_time_on_site")),
        bounce_rate: rate(body.get("bounce_rate")),
        page_views: number(body.get("nb_actions")),
    })
}

/// `Events.getName` response: one row per event name
pub fn parse_events(body: &str, period: StatsPeriod, from: NaiveDate, to: NaiveDate) -> Result<EventStats> {
    let body: Value = serde_json::from_str(body)?;
    check_api_error(&body)?;

    let mut events = BTreeMap::new();
    for row in body.as_array().map(Vec::as_slice).unwrap_or_default() {
        let Some(label) = row.get("label").and_then(Value::as_str) else {
            continue;
        };
        *events.entry(label.to_string()).or_insert(0) += number(row.get("nb_events"));
    }

    Ok(EventStats {
        period,
        date_from: from,
        date_to: to,
        events,
    })
}

impl StatsClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, site_id: u32) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            site_id,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let url = config
            .stats_url
            .as_deref()
            .ok_or_else(|| Error::Config("HOUSING_STATS_URL is not set".into()))?;
        let token = config
            .stats_token
            .as_deref()
            .ok_or_else(|| Error::Config("HOUSING_STATS_TOKEN is not set".into()))?;
        Self::new(url, token, config.stats_site_id)
    }

    async fn call(&self, method: &str, period: StatsPeriod, from: NaiveDate, to: NaiveDate) -> Result<String> {
        debug!("Calling {method} for {period} {from}..{to}");

        let site_id = self.site_id.to_string();
        let date = date_param(period, from, to);
        let response = self
            .client
            .post(format!("{}/index.php", self.base_url))
            .query(&[
                ("module", "API"),
                ("method", method),
                ("idSite", site_id.as_str()),
                ("period", period.as_str()),
                ("date", date.as_str()),
                ("format", "JSON"),
            ])
            .form(&[("token_auth", self.token.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Analytics API returned status: {}", response.status());
            return Err(Error::Import(format!(
                "analytics API returned {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    pub async fn fetch_stats(&self, period: StatsPeriod, from: NaiveDate, to: NaiveDate) -> Result<Stats> {
        let body = self.call("VisitsSummary.get", period, from, to).await?;
        parse_visits(&body, period, from, to)
    }

    pub async fn fetch_event_stats(
        &self,
        period: StatsPeriod,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<EventStats> {
        let body = self.call("Events.getName", period, from, to).await?;
        parse_events(&body, period, from, to)
    }

    /// Fetches both snapshots and stores them, replacing any earlier pull
    pub async fn sync(
        &self,
        db: &Database,
        period: StatsPeriod,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(Stats, EventStats)> {
        if from > to {
            return Err(Error::validation(format!("{from} is after {to}")));
        }

        let stats = self.fetch_stats(period, from, to).await?;
        let events = self.fetch_event_stats(period, from, to).await?;
        db.upsert_stats(&stats).await?;
        db.upsert_event_stats(&events).await?;

        info!(
            "Synced {period} stats {from}..{to}: {} visits, {} event names",
            stats.visits,
            events.events.len()
        );
        Ok((stats, events))
    }
}
