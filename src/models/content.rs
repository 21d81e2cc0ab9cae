use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TerritoryRef;
use crate::error::Error;

/// FAQ entry, global when no territory is attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionAnswer {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub territory: Option<TerritoryRef>,
    pub order: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestionAnswer {
    pub title: String,
    pub content: String,
    pub territory: Option<TerritoryRef>,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
    Year,
    Range,
}

impl StatsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Day => "day",
            StatsPeriod::Week => "week",
            StatsPeriod::Month => "month",
            StatsPeriod::Year => "year",
            StatsPeriod::Range => "range",
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(StatsPeriod::Day),
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            "year" => Ok(StatsPeriod::Year),
            "range" => Ok(StatsPeriod::Range),
            other => Err(Error::validation(format!("unknown stats period '{other}'"))),
        }
    }
}

/// Audience snapshot keyed by `(period, date_from, date_to)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub period: StatsPeriod,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub unique_visitors: u64,
    pub visits: u64,
    pub average_duration_secs: u64,
    pub bounce_rate: f64,
    pub page_views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventStats {
    pub period: StatsPeriod,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub events: BTreeMap<String, u64>,
}
