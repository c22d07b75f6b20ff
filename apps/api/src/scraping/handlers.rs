use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::scrape_run::ScrapeRunRow;
use crate::scraping::fetcher::{FetchPolicy, Fetcher};
use crate::scraping::pipeline::{spawn_scrape_run, ScrapeRequest};
use crate::scraping::runs;
use crate::scraping::sites::Site;
use crate::settings::UserSettings;
use crate::state::AppState;

/// Overrides for a single run; anything omitted comes from the saved settings.
#[derive(Debug, Default, Deserialize)]
pub struct StartScrapeRequest {
    pub sites: Option<Vec<Site>>,
    pub search_terms: Option<Vec<String>>,
    pub location: Option<String>,
    pub pages_per_site: Option<u32>,
    pub max_jobs: Option<usize>,
}

pub fn build_scrape_request(
    body: StartScrapeRequest,
    settings: &UserSettings,
) -> Result<ScrapeRequest, AppError> {
    let sites = body.sites.unwrap_or_else(|| settings.sites());
    if sites.is_empty() {
        return Err(AppError::Validation("at least one job site is required".to_string()));
    }

    let search_terms: Vec<String> = body
        .search_terms
        .unwrap_or_else(|| settings.search_terms.clone())
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if search_terms.is_empty() {
        return Err(AppError::Validation("at least one search term is required".to_string()));
    }

    let pages_per_site = body.pages_per_site.unwrap_or(settings.pages_per_site);
    let max_jobs = body.max_jobs.unwrap_or(settings.max_jobs);
    if pages_per_site == 0 || max_jobs == 0 {
        return Err(AppError::Validation(
            "pages_per_site and max_jobs must be at least 1".to_string(),
        ));
    }

    Ok(ScrapeRequest {
        sites,
        search_terms,
        location: body.location.unwrap_or_else(|| settings.location.clone()),
        pages_per_site,
        max_jobs,
    })
}

/// POST /api/v1/scrape
/// Starts a background run and returns it immediately with status `running`.
pub async fn handle_start_scrape(
    State(state): State<AppState>,
    Json(body): Json<StartScrapeRequest>,
) -> Result<(StatusCode, Json<ScrapeRunRow>), AppError> {
    let settings = state.settings.read().await.clone();
    let request = build_scrape_request(body, &settings)?;

    let fetcher = Fetcher::new(
        &state.config.user_agent,
        state.config.request_timeout,
        FetchPolicy::from_settings(&settings),
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    let run = spawn_scrape_run(state.db.clone(), fetcher, request).await?;
    Ok((StatusCode::ACCEPTED, Json(run)))
}

/// GET /api/v1/scrape/:id
pub async fn handle_get_scrape_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScrapeRunRow>, AppError> {
    runs::get_run(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Scrape run {id} not found")))
}
