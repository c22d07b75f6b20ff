use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: String,
    pub url: String,
    /// Site key (`seek`, `indeed`, `linkedin`) or `manual`.
    pub source: String,
    pub deadline: Option<NaiveDate>,
    pub scraped_at: DateTime<Utc>,
    pub expired: bool,
    pub applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
    pub match_score: Option<f64>,
}

/// A listing ready to be upserted. `url` is the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

fn default_source() -> String {
    "manual".to_string()
}

/// Filters for listing stored jobs. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    pub expired: Option<bool>,
    pub applied: Option<bool>,
    pub source: Option<String>,
    pub min_match: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStats {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub applied: i64,
    pub unscored: i64,
    pub excellent: i64,
    pub good: i64,
    pub fair: i64,
    pub poor: i64,
}
