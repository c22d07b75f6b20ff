use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::applications::repository::{self, NewApplication, StatusChange};
use crate::errors::AppError;
use crate::letters::generator::LetterSource;
use crate::letters::handlers::{letter_for_job, load_job, save_to_disk};
use crate::models::application::{
    ApplicationRow, ApplicationStats, ApplicationStatus, ApplicationWithJobRow,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListApplicationsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub job_id: i64,
    /// Supplied text is stored as a manual letter; otherwise one is generated.
    pub cover_letter: Option<String>,
    pub resume_id: Option<i64>,
    #[serde(default)]
    pub save_letter: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLetterRequest {
    pub cover_letter: String,
    #[serde(default)]
    pub save_letter: bool,
}

fn parse_status(raw: &str) -> Result<ApplicationStatus, AppError> {
    raw.parse::<ApplicationStatus>().map_err(AppError::Validation)
}

/// GET /api/v1/applications?status=
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<ApplicationWithJobRow>>, AppError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;
    Ok(Json(repository::list_applications(&state.db, status).await?))
}

/// POST /api/v1/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    Json(body): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let job = load_job(&state, body.job_id).await?;
    // Checked before the letter is generated or written to disk.
    if repository::application_for_job(&state.db, job.id).await?.is_some() {
        return Err(AppError::Conflict(format!("Job {} already has an application", job.id)));
    }

    let (text, source) = match body.cover_letter.filter(|t| !t.trim().is_empty()) {
        Some(text) => (text, LetterSource::Manual),
        None => {
            let letter = letter_for_job(&state, &job, body.resume_id).await?;
            (letter.text, letter.source)
        }
    };

    let letter_path = if body.save_letter {
        Some(save_to_disk(&state, &job, &text).await?)
    } else {
        None
    };

    let new = NewApplication {
        job_id: job.id,
        cover_letter: text,
        letter_source: source.to_string(),
        letter_path,
    };
    let row = repository::create_application(&state.db, &new)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Job {} already has an application", job.id))
            }
            other => AppError::Database(other),
        })?;

    info!("Created application {} for job {} ({} letter)", row.id, job.id, source);
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/applications/stats
pub async fn handle_application_stats(
    State(state): State<AppState>,
) -> Result<Json<ApplicationStats>, AppError> {
    Ok(Json(repository::application_stats(&state.db).await?))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationRow>, AppError> {
    repository::get_application(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let next = parse_status(&body.status)?;
    match repository::update_status(&state.db, id, next).await? {
        StatusChange::Updated(row) => {
            info!("Application {id} is now {next}");
            Ok(Json(row))
        }
        StatusChange::NotFound => Err(AppError::NotFound(format!("Application {id} not found"))),
        StatusChange::Refused { from, to } => Err(AppError::Conflict(format!(
            "Application {id} cannot move from {from} to {to}"
        ))),
    }
}

/// PUT /api/v1/applications/:id/letter
pub async fn handle_update_letter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateLetterRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    if body.cover_letter.trim().is_empty() {
        return Err(AppError::Validation("cover_letter must not be empty".to_string()));
    }

    let existing = repository::get_application(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;

    let letter_path = if body.save_letter {
        let job = load_job(&state, existing.job_id).await?;
        Some(save_to_disk(&state, &job, &body.cover_letter).await?)
    } else {
        None
    };

    repository::update_letter(
        &state.db,
        id,
        &body.cover_letter,
        LetterSource::Manual.as_str(),
        letter_path.as_deref(),
    )
    .await?
    .map(Json)
    .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}
