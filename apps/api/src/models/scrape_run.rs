use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

pub const RUN_RUNNING: &str = "running";
pub const RUN_COMPLETED: &str = "completed";
pub const RUN_FAILED: &str = "failed";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScrapeRunRow {
    pub id: String,
    pub status: String,
    pub sites: Json<Vec<String>>,
    pub search_terms: Json<Vec<String>>,
    pub location: String,
    pub pages_found: i64,
    pub jobs_found: i64,
    pub jobs_new: i64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
