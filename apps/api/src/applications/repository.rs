//! Persistence for applications. One application per job; status changes run in a
//! transaction so the job's applied flag moves together with the application.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::jobs::repository::mark_job_applied_in;
use crate::models::application::{
    ApplicationRow, ApplicationStats, ApplicationStatus, ApplicationWithJobRow, CompanyCount,
    DayCount,
};

const TOP_COMPANIES: i64 = 5;

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: i64,
    pub cover_letter: String,
    pub letter_source: String,
    pub letter_path: Option<String>,
}

#[derive(Debug)]
pub enum StatusChange {
    Updated(ApplicationRow),
    NotFound,
    Refused {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Fails with a unique violation when the job already has an application.
pub async fn create_application(
    pool: &SqlitePool,
    new: &NewApplication,
) -> Result<ApplicationRow, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications (job_id, cover_letter, letter_source, letter_path, status,
                                  created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new.job_id)
    .bind(&new.cover_letter)
    .bind(&new.letter_source)
    .bind(&new.letter_path)
    .bind(ApplicationStatus::Draft.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn get_application(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn application_for_job(
    pool: &SqlitePool,
    job_id: i64,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE job_id = ?")
        .bind(job_id)
        .fetch_optional(pool)
        .await
}

/// Newest first, optionally restricted to one status.
pub async fn list_applications(
    pool: &SqlitePool,
    status: Option<ApplicationStatus>,
) -> Result<Vec<ApplicationWithJobRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationWithJobRow>(
        r#"
        SELECT a.id, a.job_id, j.title AS job_title, j.company, j.url AS job_url,
               a.letter_source, a.letter_path, a.status, a.applied_at,
               a.created_at, a.updated_at
        FROM applications a
        JOIN jobs j ON j.id = a.job_id
        WHERE ?1 IS NULL OR a.status = ?1
        ORDER BY a.created_at DESC, a.id DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
}

pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    next: ApplicationStatus,
) -> Result<StatusChange, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let current: Option<ApplicationRow> =
        sqlx::query_as("SELECT * FROM applications WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(current) = current else {
        return Ok(StatusChange::NotFound);
    };

    // unknown values written outside the API are treated as draft
    let from = current
        .status
        .parse::<ApplicationStatus>()
        .unwrap_or(ApplicationStatus::Draft);
    if !from.can_transition_to(next) {
        return Ok(StatusChange::Refused { from, to: next });
    }

    let now = Utc::now();
    let first_submission = next == ApplicationStatus::Applied && current.applied_at.is_none();
    let applied_at = if first_submission {
        Some(now)
    } else {
        current.applied_at
    };

    let updated = sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications SET status = ?, applied_at = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(next.as_str())
    .bind(applied_at)
    .bind(now)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if first_submission {
        mark_job_applied_in(&mut *tx, current.job_id, now).await?;
    }

    tx.commit().await?;
    Ok(StatusChange::Updated(updated))
}

pub async fn update_letter(
    pool: &SqlitePool,
    id: i64,
    cover_letter: &str,
    letter_source: &str,
    letter_path: Option<&str>,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications
        SET cover_letter = ?, letter_source = ?, letter_path = COALESCE(?, letter_path),
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(cover_letter)
    .bind(letter_source)
    .bind(letter_path)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn application_stats(pool: &SqlitePool) -> Result<ApplicationStats, sqlx::Error> {
    let (total, submitted): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(applied_at) FROM applications",
    )
    .fetch_one(pool)
    .await?;

    let by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM applications GROUP BY status")
            .fetch_all(pool)
            .await?;

    let top_companies = sqlx::query_as::<_, CompanyCount>(
        r#"
        SELECT j.company AS company, COUNT(*) AS count
        FROM applications a
        JOIN jobs j ON j.id = a.job_id
        GROUP BY j.company
        ORDER BY count DESC, company ASC
        LIMIT ?
        "#,
    )
    .bind(TOP_COMPANIES)
    .fetch_all(pool)
    .await?;

    let per_day = sqlx::query_as::<_, DayCount>(
        r#"
        SELECT substr(created_at, 1, 10) AS day, COUNT(*) AS count
        FROM applications
        GROUP BY day
        ORDER BY day ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(ApplicationStats {
        total,
        submitted,
        by_status: by_status.into_iter().collect(),
        top_companies,
        per_day,
    })
}
