use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::scrape_run::{ScrapeRunRow, RUN_COMPLETED, RUN_FAILED, RUN_RUNNING};
use crate::scraping::pipeline::{ScrapeRequest, ScrapeSummary};

pub async fn create_run(
    pool: &SqlitePool,
    request: &ScrapeRequest,
) -> Result<ScrapeRunRow, sqlx::Error> {
    let sites: Vec<String> = request.sites.iter().map(|s| s.as_str().to_string()).collect();

    sqlx::query_as::<_, ScrapeRunRow>(
        r#"
        INSERT INTO scrape_runs (id, status, sites, search_terms, location, started_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(RUN_RUNNING)
    .bind(Json(sites))
    .bind(Json(request.search_terms.clone()))
    .bind(&request.location)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn complete_run(
    pool: &SqlitePool,
    id: &str,
    summary: &ScrapeSummary,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE scrape_runs
        SET status = ?, pages_found = ?, jobs_found = ?, jobs_new = ?, finished_at = ?
        WHERE id = ?
        "#,
    )
    .bind(RUN_COMPLETED)
    .bind(summary.pages_found as i64)
    .bind(summary.jobs_found as i64)
    .bind(summary.jobs_new as i64)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fail_run(pool: &SqlitePool, id: &str, message: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE scrape_runs SET status = ?, error_message = ?, finished_at = ? WHERE id = ?",
    )
    .bind(RUN_FAILED)
    .bind(message)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_run(pool: &SqlitePool, id: &str) -> Result<Option<ScrapeRunRow>, sqlx::Error> {
    sqlx::query_as::<_, ScrapeRunRow>("SELECT * FROM scrape_runs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}
