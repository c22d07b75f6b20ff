pub mod health;
pub mod settings;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::jobs::handlers as jobs;
use crate::letters::handlers as letters;
use crate::matching::handlers as matching;
use crate::resume::handlers as resumes;
use crate::scraping::handlers as scraping;
use crate::state::AppState;

/// Résumé uploads may be larger than axum's 2 MB default.
const RESUME_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Settings
        .route(
            "/api/v1/settings",
            get(settings::handle_get_settings).put(settings::handle_put_settings),
        )
        // Scraping
        .route("/api/v1/scrape", post(scraping::handle_start_scrape))
        .route("/api/v1/scrape/:id", get(scraping::handle_get_scrape_run))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/search", get(jobs::handle_search_jobs))
        .route("/api/v1/jobs/stats", get(jobs::handle_job_stats))
        .route("/api/v1/jobs/expiring", get(jobs::handle_expiring_jobs))
        .route("/api/v1/jobs/expire", post(jobs::handle_check_expired))
        .route("/api/v1/jobs/expired", delete(jobs::handle_delete_expired))
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        // Résumés
        .route(
            "/api/v1/resumes",
            post(resumes::handle_upload_resume)
                .get(resumes::handle_list_resumes)
                .layer(DefaultBodyLimit::max(RESUME_UPLOAD_LIMIT)),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get_resume).delete(resumes::handle_delete_resume),
        )
        // Matching & letters
        .route("/api/v1/matches", post(matching::handle_run_matches))
        .route("/api/v1/letters", post(letters::handle_generate_letter))
        // Applications
        .route(
            "/api/v1/applications",
            get(applications::handle_list_applications)
                .post(applications::handle_create_application),
        )
        .route(
            "/api/v1/applications/stats",
            get(applications::handle_application_stats),
        )
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application),
        )
        .route(
            "/api/v1/applications/:id/status",
            patch(applications::handle_update_status),
        )
        .route(
            "/api/v1/applications/:id/letter",
            put(applications::handle_update_letter),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let app = build_router(test_state().await);
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health_route() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jobscout");
    }

    #[tokio::test]
    async fn test_missing_job_renders_error_envelope() {
        let (status, body) =
            send(Request::get("/api/v1/jobs/12345").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_static_job_paths_win_over_id() {
        let (status, body) =
            send(Request::get("/api/v1/jobs/stats").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_create_job_over_http() {
        let request = Request::post("/api/v1/jobs")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"title":"SRE","url":"https://careers.example/sre","description":"deadline 01/02/2040"}"#,
            ))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["deadline"], "2040-02-01");
        assert_eq!(body["source"], "manual");
    }
}
