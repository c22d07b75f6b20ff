use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::resume::{ResumeRow, ResumeSummaryRow};
use crate::resume::parser::ParsedResume;

pub async fn insert_resume(
    pool: &SqlitePool,
    file_name: &str,
    parsed: &ParsedResume,
) -> Result<ResumeRow, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (file_name, skills, experience, education, email, phone,
                             raw_text, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(file_name)
    .bind(Json(&parsed.skills))
    .bind(Json(&parsed.experience))
    .bind(Json(&parsed.education))
    .bind(&parsed.email)
    .bind(&parsed.phone)
    .bind(&parsed.raw_text)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn get_resume(pool: &SqlitePool, id: i64) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn latest_resume(pool: &SqlitePool) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes ORDER BY created_at DESC, id DESC LIMIT 1")
        .fetch_optional(pool)
        .await
}

pub async fn list_resumes(pool: &SqlitePool) -> Result<Vec<ResumeSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeSummaryRow>(
        "SELECT id, file_name, skills, email, created_at FROM resumes ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn delete_resume(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM resumes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
