//! Persistence for job listings. URL is the identity of a listing; re-scraping a URL
//! refreshes its content but never its first-seen time, applied flag or last score.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::matching::scorer::MatchTier;
use crate::models::job::{JobFilter, JobRow, MatchStats, NewJob};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Inserts or refreshes one listing inside an open connection or transaction.
/// Returns the row id and whether the row is new.
pub async fn upsert_job_in(
    conn: &mut SqliteConnection,
    job: &NewJob,
    now: DateTime<Utc>,
) -> Result<(i64, bool), sqlx::Error> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM jobs WHERE url = ?")
        .bind(&job.url)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        sqlx::query(
            r#"
            UPDATE jobs
            SET title = ?, company = ?, location = ?,
                salary = ?,
                description = ?, source = ?,
                deadline = COALESCE(?, deadline)
            WHERE id = ?
            "#,
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(&job.description)
        .bind(&job.source)
        .bind(job.deadline)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        return Ok((id, false));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO jobs (title, company, location, salary, description, url, source,
                          deadline, scraped_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&job.title)
    .bind(&job.company)
    .bind(&job.location)
    .bind(&job.salary)
    .bind(&job.description)
    .bind(&job.url)
    .bind(&job.source)
    .bind(job.deadline)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, true))
}

pub async fn upsert_job(pool: &SqlitePool, job: &NewJob) -> Result<(i64, bool), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    upsert_job_in(&mut *conn, job, Utc::now()).await
}

/// Upserts every listing in one transaction. Returns how many rows were new.
pub async fn upsert_jobs_batch(pool: &SqlitePool, jobs: &[NewJob]) -> Result<u64, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let mut new_rows = 0u64;

    for job in jobs {
        let (_, is_new) = upsert_job_in(&mut *tx, job, now).await?;
        if is_new {
            new_rows += 1;
        }
    }

    tx.commit().await?;
    info!("Stored {} listings ({} new)", jobs.len(), new_rows);
    Ok(new_rows)
}

pub async fn get_job(pool: &SqlitePool, id: i64) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &JobFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(expired) = filter.expired {
        qb.push(" AND expired = ").push_bind(expired);
    }
    if let Some(applied) = filter.applied {
        qb.push(" AND applied = ").push_bind(applied);
    }
    if let Some(source) = filter.source.as_ref().filter(|s| !s.is_empty()) {
        qb.push(" AND source = ").push_bind(source.to_lowercase());
    }
    if let Some(min_match) = filter.min_match {
        qb.push(" AND match_score >= ").push_bind(min_match);
    }
}

/// One page of listings, newest first, plus the total number matching the filter.
pub async fn list_jobs(
    pool: &SqlitePool,
    filter: &JobFilter,
) -> Result<(Vec<JobRow>, i64), sqlx::Error> {
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = filter.offset.unwrap_or(0).max(0);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM jobs");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new("SELECT * FROM jobs");
    push_filters(&mut page, filter);
    page.push(" ORDER BY scraped_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = page.build_query_as::<JobRow>().fetch_all(pool).await?;

    Ok((rows, total))
}

/// Every listing eligible for matching.
pub async fn jobs_for_matching(
    pool: &SqlitePool,
    include_expired: bool,
) -> Result<Vec<JobRow>, sqlx::Error> {
    let sql = if include_expired {
        "SELECT * FROM jobs ORDER BY id"
    } else {
        "SELECT * FROM jobs WHERE expired = 0 ORDER BY id"
    };
    sqlx::query_as::<_, JobRow>(sql).fetch_all(pool).await
}

pub async fn search_jobs(
    pool: &SqlitePool,
    query: &str,
    limit: i64,
) -> Result<Vec<JobRow>, sqlx::Error> {
    let pattern = format!("%{}%", escape_like(query.trim()));
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE title LIKE ?1 ESCAPE '\'
           OR company LIKE ?1 ESCAPE '\'
           OR description LIKE ?1 ESCAPE '\'
        ORDER BY match_score IS NULL, match_score DESC, scraped_at DESC
        LIMIT ?2
        "#,
    )
    .bind(pattern)
    .bind(limit.clamp(1, MAX_PAGE_SIZE))
    .fetch_all(pool)
    .await
}

/// Makes `%` and `_` in user input match themselves.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub async fn update_match_scores(
    pool: &SqlitePool,
    scores: &[(i64, f64)],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut updated = 0;
    for (id, score) in scores {
        updated += sqlx::query("UPDATE jobs SET match_score = ? WHERE id = ?")
            .bind(score)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    Ok(updated)
}

pub async fn mark_job_applied_in(
    conn: &mut SqliteConnection,
    id: i64,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE jobs SET applied = 1, applied_at = ? WHERE id = ?")
        .bind(at)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Flags active listings whose deadline is before `today`. Returns how many changed.
pub async fn check_expired_jobs(pool: &SqlitePool, today: NaiveDate) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE jobs SET expired = 1 WHERE expired = 0 AND deadline IS NOT NULL AND deadline < ?",
    )
    .bind(today)
    .execute(pool)
    .await?;

    let count = result.rows_affected();
    if count > 0 {
        info!("Marked {count} listings as expired");
    }
    Ok(count)
}

/// Active listings closing within `[today, today + days]`, soonest first.
pub async fn get_expiring_jobs(
    pool: &SqlitePool,
    today: NaiveDate,
    days: i64,
) -> Result<Vec<JobRow>, sqlx::Error> {
    let until = today + Duration::days(days.max(0));
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE expired = 0 AND deadline >= ? AND deadline <= ?
        ORDER BY deadline ASC, id ASC
        "#,
    )
    .bind(today)
    .bind(until)
    .fetch_all(pool)
    .await
}

/// Deletes expired listings first seen before `cutoff`. Applied listings are kept.
pub async fn delete_expired_jobs(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM jobs WHERE expired = 1 AND applied = 0 AND scraped_at < ?")
            .bind(cutoff)
            .execute(pool)
            .await?;

    let count = result.rows_affected();
    info!("Deleted {count} expired listings scraped before {cutoff}");
    Ok(count)
}

pub async fn match_stats(pool: &SqlitePool) -> Result<MatchStats, sqlx::Error> {
    let (total, expired, applied, unscored): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(expired), 0),
               COALESCE(SUM(applied), 0),
               COALESCE(SUM(CASE WHEN match_score IS NULL THEN 1 ELSE 0 END), 0)
        FROM jobs
        "#,
    )
    .fetch_one(pool)
    .await?;

    let scores: Vec<f64> =
        sqlx::query_scalar("SELECT match_score FROM jobs WHERE match_score IS NOT NULL")
            .fetch_all(pool)
            .await?;

    let mut stats = MatchStats {
        total,
        active: total - expired,
        expired,
        applied,
        unscored,
        ..MatchStats::default()
    };
    for score in scores {
        match MatchTier::from_score(score) {
            MatchTier::Excellent => stats.excellent += 1,
            MatchTier::Good => stats.good += 1,
            MatchTier::Fair => stats.fair += 1,
            MatchTier::Poor => stats.poor += 1,
        }
    }
    Ok(stats)
}
