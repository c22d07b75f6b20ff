use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::jobs::repository as jobs_repo;
use crate::matching::scorer::{meets_threshold, JobMatch, MatchInput, SkippedJob};
use crate::resume::repository as resume_repo;
use crate::resume::skills::SkillMatcher;
use crate::state::AppState;

const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct MatchRequest {
    /// Defaults to the most recently uploaded résumé.
    pub resume_id: Option<i64>,
    /// `0` returns every ranked listing.
    pub top_n: Option<usize>,
    #[serde(default)]
    pub include_expired: bool,
}

#[derive(Debug, Serialize)]
pub struct RankedMatch {
    #[serde(flatten)]
    pub job: JobMatch,
    pub meets_threshold: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub resume_id: i64,
    pub threshold: f64,
    pub scored: usize,
    pub qualified: usize,
    pub matches: Vec<RankedMatch>,
    pub skipped: Vec<SkippedJob>,
    pub scorer_backend: String,
}

/// POST /api/v1/matches
/// Scores every eligible listing against a résumé, stores the scores and returns the top N.
pub async fn handle_run_matches(
    State(state): State<AppState>,
    Json(body): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let resume = match body.resume_id {
        Some(id) => resume_repo::get_resume(&state.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Résumé {id} not found")))?,
        None => resume_repo::latest_resume(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("No résumé has been uploaded".to_string()))?,
    };
    let resume_id = resume.id;

    let jobs = jobs_repo::jobs_for_matching(&state.db, body.include_expired).await?;
    let (extra_skills, threshold) = {
        let settings = state.settings.read().await;
        (settings.skills.clone(), settings.match_threshold)
    };
    let skills = SkillMatcher::new(&extra_skills).map_err(|e| AppError::Internal(e.into()))?;

    let report = state
        .match_scorer
        .score(MatchInput {
            resume,
            jobs,
            skills,
        })
        .await?;

    let scores: Vec<(i64, f64)> = report
        .ranked
        .iter()
        .map(|m| (m.job_id, m.match_percentage))
        .collect();
    jobs_repo::update_match_scores(&state.db, &scores).await?;

    let scored = report.ranked.len();
    let qualified = report
        .ranked
        .iter()
        .filter(|m| meets_threshold(m.match_percentage, threshold))
        .count();
    info!(
        "Scored {scored} listings against résumé {resume_id} ({qualified} at or above {threshold}, {} skipped)",
        report.skipped.len()
    );

    let top_n = body.top_n.unwrap_or(DEFAULT_TOP_N);
    let take = if top_n == 0 { scored } else { top_n };
    let matches = report
        .ranked
        .into_iter()
        .take(take)
        .map(|job| RankedMatch {
            meets_threshold: meets_threshold(job.match_percentage, threshold),
            job,
        })
        .collect();

    Ok(Json(MatchResponse {
        resume_id,
        threshold,
        scored,
        qualified,
        matches,
        skipped: report.skipped,
        scorer_backend: report.scorer_backend,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::repository::{get_job, upsert_job};
    use crate::models::job::NewJob;
    use crate::resume::parser::parse_text;
    use crate::state::test_state;

    fn listing(url: &str, description: &str) -> NewJob {
        NewJob {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Perth".to_string(),
            salary: None,
            description: description.to_string(),
            url: url.to_string(),
            source: "manual".to_string(),
            deadline: None,
        }
    }

    #[tokio::test]
    async fn test_matching_without_resume_is_not_found() {
        let state = test_state().await;
        let err = handle_run_matches(State(state), Json(MatchRequest::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_matching_persists_scores_and_truncates() {
        let state = test_state().await;
        let skills = SkillMatcher::new(&[]).unwrap();
        let parsed = parse_text(
            "Skills\nRust, Docker, PostgreSQL\n\nExperience\nBuilt Rust services on PostgreSQL.",
            &skills,
        );
        resume_repo::insert_resume(&state.db, "cv.txt", &parsed)
            .await
            .unwrap();

        let (best, _) = upsert_job(
            &state.db,
            &listing("https://jobs.example/1", "Rust developer with Docker and PostgreSQL"),
        )
        .await
        .unwrap();
        upsert_job(&state.db, &listing("https://jobs.example/2", "Java and Spring role"))
            .await
            .unwrap();
        upsert_job(&state.db, &listing("https://jobs.example/3", ""))
            .await
            .unwrap();

        let body = MatchRequest {
            top_n: Some(1),
            ..MatchRequest::default()
        };
        let Json(response) = handle_run_matches(State(state.clone()), Json(body))
            .await
            .unwrap();

        assert_eq!(response.scored, 2);
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].job.job_id, best);
        assert_eq!(response.skipped.len(), 1);
        assert_eq!(response.scorer_backend, "tfidf-skill");

        let stored = get_job(&state.db, best).await.unwrap().unwrap();
        assert_eq!(stored.match_score, Some(response.matches[0].job.match_percentage));
    }
}
