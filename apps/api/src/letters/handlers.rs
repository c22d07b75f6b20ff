use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::jobs::repository as jobs_repo;
use crate::letters::generator::{generate_cover_letter, save_letter, CoverLetter, LetterSource};
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::resume::repository as resume_repo;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LetterRequest {
    pub job_id: i64,
    /// Defaults to the most recent résumé, if any.
    pub resume_id: Option<i64>,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct LetterResponse {
    pub job_id: i64,
    pub text: String,
    pub source: LetterSource,
    pub path: Option<String>,
}

pub async fn load_job(state: &AppState, job_id: i64) -> Result<JobRow, AppError> {
    jobs_repo::get_job(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// An explicit id must exist; without one the latest résumé is used when there is one.
pub async fn load_resume(
    state: &AppState,
    resume_id: Option<i64>,
) -> Result<Option<ResumeRow>, AppError> {
    match resume_id {
        Some(id) => resume_repo::get_resume(&state.db, id)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::NotFound(format!("Résumé {id} not found"))),
        None => Ok(resume_repo::latest_resume(&state.db).await?),
    }
}

pub async fn letter_for_job(
    state: &AppState,
    job: &JobRow,
    resume_id: Option<i64>,
) -> Result<CoverLetter, AppError> {
    let resume = load_resume(state, resume_id).await?;
    let profile = state.settings.read().await.clone();
    Ok(generate_cover_letter(
        state.llm.as_ref(),
        state.letter_cache.as_ref(),
        job,
        resume.as_ref(),
        &profile,
        Utc::now().date_naive(),
    )
    .await)
}

pub async fn save_to_disk(state: &AppState, job: &JobRow, text: &str) -> Result<String, AppError> {
    let path = save_letter(&state.config.cover_letter_dir, job, text).await?;
    Ok(path.display().to_string())
}

/// POST /api/v1/letters
pub async fn handle_generate_letter(
    State(state): State<AppState>,
    Json(body): Json<LetterRequest>,
) -> Result<Json<LetterResponse>, AppError> {
    let job = load_job(&state, body.job_id).await?;
    let letter = letter_for_job(&state, &job, body.resume_id).await?;

    let path = if body.save {
        Some(save_to_disk(&state, &job, &letter.text).await?)
    } else {
        None
    };

    Ok(Json(LetterResponse {
        job_id: job.id,
        text: letter.text,
        source: letter.source,
        path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::repository::upsert_job;
    use crate::models::job::NewJob;
    use crate::state::test_state;

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let state = test_state().await;
        let body = LetterRequest {
            job_id: 99,
            resume_id: None,
            save: false,
        };
        let err = handle_generate_letter(State(state), Json(body)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_letter_without_model_is_template_and_saved() {
        let mut state = test_state().await;
        let dir = tempfile::tempdir().unwrap();
        state.config.cover_letter_dir = dir.path().to_path_buf();

        let job = NewJob {
            title: "Data Analyst".to_string(),
            company: "Globex".to_string(),
            location: String::new(),
            salary: None,
            description: "SQL and Excel".to_string(),
            url: "https://jobs.example/analyst".to_string(),
            source: "manual".to_string(),
            deadline: None,
        };
        let (job_id, _) = upsert_job(&state.db, &job).await.unwrap();

        let body = LetterRequest {
            job_id,
            resume_id: None,
            save: true,
        };
        let Json(response) = handle_generate_letter(State(state), Json(body)).await.unwrap();

        assert_eq!(response.source, LetterSource::Fallback);
        assert!(response.text.contains("Data Analyst position at Globex"));
        let path = response.path.unwrap();
        assert!(path.ends_with("cover_letter_Globex_Data_Analyst.txt"));
        assert!(std::path::Path::new(&path).exists());
    }
}
