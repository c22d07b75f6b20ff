use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::errors::AppError;
use crate::jobs::repository;
use crate::models::job::{JobFilter, JobRow, MatchStats, NewJob};
use crate::scraping::deadline::extract_deadline;
use crate::scraping::extract::is_valid_job_url;
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: i64 = 50;
const DEFAULT_EXPIRING_DAYS: i64 = 7;
const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
pub struct JobPage {
    pub jobs: Vec<JobRow>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<JobPage>, AppError> {
    let (jobs, total) = repository::list_jobs(&state.db, &filter).await?;
    Ok(Json(JobPage { jobs, total }))
}

/// POST /api/v1/jobs
/// Adds a listing by hand. Without an explicit deadline one is read from the description.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(mut body): Json<NewJob>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    body.title = body.title.trim().to_string();
    body.url = body.url.trim().to_string();
    if body.title.is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }
    let parsed = Url::parse(&body.url)
        .map_err(|e| AppError::Validation(format!("url '{}' is invalid: {e}", body.url)))?;
    if !is_valid_job_url(&parsed) {
        return Err(AppError::Validation("url must be an http(s) address".to_string()));
    }
    if body.deadline.is_none() {
        body.deadline = Some(extract_deadline(&body.description, Utc::now().date_naive()));
    }

    let (id, is_new) = repository::upsert_job(&state.db, &body).await?;
    let row = repository::get_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

    if is_new {
        info!("Added listing {id}: {} at {}", row.title, row.company);
        Ok((StatusCode::CREATED, Json(row)))
    } else {
        Ok((StatusCode::OK, Json(row)))
    }
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobRow>, AppError> {
    repository::get_job(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// GET /api/v1/jobs/search?q=&limit=
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    if query.q.trim().is_empty() {
        return Err(AppError::Validation("q must not be empty".to_string()));
    }
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    Ok(Json(repository::search_jobs(&state.db, &query.q, limit).await?))
}

/// GET /api/v1/jobs/stats
pub async fn handle_job_stats(State(state): State<AppState>) -> Result<Json<MatchStats>, AppError> {
    Ok(Json(repository::match_stats(&state.db).await?))
}

/// GET /api/v1/jobs/expiring?days=
pub async fn handle_expiring_jobs(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    if days < 0 {
        return Err(AppError::Validation("days must not be negative".to_string()));
    }
    let today = Utc::now().date_naive();
    Ok(Json(repository::get_expiring_jobs(&state.db, today, days).await?))
}

/// POST /api/v1/jobs/expire
pub async fn handle_check_expired(
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    let count = repository::check_expired_jobs(&state.db, Utc::now().date_naive()).await?;
    Ok(Json(CountResponse { count }))
}

/// DELETE /api/v1/jobs/expired?days=
pub async fn handle_delete_expired(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<CountResponse>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_RETENTION_DAYS);
    if days < 0 {
        return Err(AppError::Validation("days must not be negative".to_string()));
    }
    let cutoff = Utc::now() - Duration::days(days);
    let count = repository::delete_expired_jobs(&state.db, cutoff).await?;
    Ok(Json(CountResponse { count }))
}
