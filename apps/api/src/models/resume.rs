use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: i64,
    pub file_name: String,
    pub skills: Json<Vec<String>>,
    pub experience: Json<Vec<String>>,
    pub education: Json<Vec<String>>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
}

/// Listing view without the bulky extracted sections.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResumeSummaryRow {
    pub id: i64,
    pub file_name: String,
    pub skills: Json<Vec<String>>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}
