use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::{ResumeRow, ResumeSummaryRow};
use crate::resume::parser::{parse_resume, ParsedResume};
use crate::resume::repository;
use crate::resume::skills::SkillMatcher;
use crate::state::AppState;

/// POST /api/v1/resumes
/// Multipart upload with a single `file` field (.pdf, .docx or .txt).
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field needs a file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        upload = Some((file_name, bytes));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;

    let extra_skills = state.settings.read().await.skills.clone();
    let name = file_name.clone();
    let parsed = tokio::task::spawn_blocking(move || -> Result<ParsedResume, AppError> {
        let matcher = SkillMatcher::new(&extra_skills).map_err(|e| AppError::Internal(e.into()))?;
        Ok(parse_resume(&name, &bytes, &matcher)?)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("resume parsing task failed: {e}")))??;

    let row = repository::insert_resume(&state.db, &file_name, &parsed).await?;
    info!(
        "Stored résumé {} ({}): {} skills, {} experience entries",
        row.id,
        file_name,
        parsed.skills.len(),
        parsed.experience.len()
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeSummaryRow>>, AppError> {
    Ok(Json(repository::list_resumes(&state.db).await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ResumeRow>, AppError> {
    repository::get_resume(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Résumé {id} not found")))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if repository::delete_resume(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Résumé {id} not found")))
    }
}
