use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TerritoryRef;

/// Landlord or residence manager publishing listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Saved search a student can be notified about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccommodationAlert {
    pub id: i64,
    pub student_id: i64,
    pub name: String,
    pub territory: TerritoryRef,
    pub is_accessible: bool,
    pub has_coliving: bool,
    pub price_max: Option<u32>,
    pub receive_notifications: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub name: String,
    pub territory: TerritoryRef,
    #[serde(default)]
    pub is_accessible: bool,
    #[serde(default)]
    pub has_coliving: bool,
    pub price_max: Option<u32>,
    #[serde(default = "default_notifications")]
    pub receive_notifications: bool,
}

fn default_notifications() -> bool {
    true
}
