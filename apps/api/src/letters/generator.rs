//! Cover-letter generation: cache, then the language model, then a plain template.
//!
//! Generation never fails outright. Cache and API errors are logged and the caller
//! still receives a letter, tagged with where it came from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::letters::cache::{cache_key, LetterCache};
use crate::letters::prompts::{build_letter_prompt, LETTER_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::settings::UserSettings;

const FALLBACK_SKILLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterSource {
    Ai,
    Cache,
    Fallback,
    Manual,
}

impl LetterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterSource::Ai => "ai",
            LetterSource::Cache => "cache",
            LetterSource::Fallback => "fallback",
            LetterSource::Manual => "manual",
        }
    }
}

impl fmt::Display for LetterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverLetter {
    pub text: String,
    pub source: LetterSource,
}

/// Skills drive both the cache key and the fallback text: the résumé's if one is
/// given, otherwise the profile's.
fn applicant_skills<'a>(resume: Option<&'a ResumeRow>, profile: &'a UserSettings) -> &'a [String] {
    match resume {
        Some(r) if !r.skills.0.is_empty() => &r.skills.0,
        _ => &profile.skills,
    }
}

pub async fn generate_cover_letter(
    llm: Option<&LlmClient>,
    cache: &dyn LetterCache,
    job: &JobRow,
    resume: Option<&ResumeRow>,
    profile: &UserSettings,
    today: NaiveDate,
) -> CoverLetter {
    let skills = applicant_skills(resume, profile);
    let key = cache_key(&job.title, &job.company, &job.description, skills);

    match cache.get(&key).await {
        Ok(Some(text)) => {
            debug!("Letter cache hit for job {} ({})", job.id, cache.backend());
            return CoverLetter {
                text,
                source: LetterSource::Cache,
            };
        }
        Ok(None) => {}
        Err(e) => warn!("Letter cache lookup failed: {e:#}"),
    }

    let Some(llm) = llm else {
        info!("No language model configured, using template letter for job {}", job.id);
        return CoverLetter {
            text: fallback_letter(job, skills, profile, today),
            source: LetterSource::Fallback,
        };
    };

    let prompt = build_letter_prompt(job, resume);
    match llm.complete(&prompt, LETTER_SYSTEM).await {
        Ok(text) => {
            if let Err(e) = cache.put(&key, &text).await {
                warn!("Failed to cache letter for job {}: {e:#}", job.id);
            }
            info!("Generated letter for job {} with {}", job.id, llm.model());
            CoverLetter {
                text,
                source: LetterSource::Ai,
            }
        }
        Err(e) => {
            warn!("Letter generation failed for job {}, using template: {e}", job.id);
            CoverLetter {
                text: fallback_letter(job, skills, profile, today),
                source: LetterSource::Fallback,
            }
        }
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value.trim()
    }
}

pub fn fallback_letter(
    job: &JobRow,
    skills: &[String],
    profile: &UserSettings,
    today: NaiveDate,
) -> String {
    let title = or_placeholder(&job.title, "the position");
    let company = or_placeholder(&job.company, "your company");

    let body = if skills.is_empty() {
        "I am excited to apply for this position and believe my skills and experience make \
         me a strong candidate. I am eager to contribute to your team and confident that I \
         can make a positive impact in this role."
            .to_string()
    } else {
        let top: Vec<&str> = skills.iter().take(FALLBACK_SKILLS).map(String::as_str).collect();
        format!(
            "Based on my review of the job description, I believe my skills in {} make me a \
             strong candidate for this role. My previous experience has prepared me to \
             contribute effectively to your team from day one.",
            top.join(", ")
        )
    };

    format!(
        "{date}\n\n\
         Dear Hiring Manager,\n\n\
         I am writing to express my interest in the {title} position at {company}. \
         This opportunity aligns closely with my skills and career goals.\n\n\
         {body}\n\n\
         I would welcome the opportunity to discuss how I can contribute to your team.\n\n\
         Thank you for your consideration.\n\n\
         Sincerely,\n\
         {name}\n\
         {email}\n\
         {phone}",
        date = today.format("%B %d, %Y"),
        name = or_placeholder(&profile.name, "Your Name"),
        email = or_placeholder(&profile.email, "your.email@example.com"),
        phone = or_placeholder(&profile.phone, "Your Phone"),
    )
}

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"))
}

/// Keeps word characters, whitespace and `-`; spaces become `_`.
pub fn sanitize_filename(name: &str) -> String {
    unsafe_chars()
        .replace_all(name, "")
        .trim()
        .replace(' ', "_")
}

/// Writes `cover_letter_{company}_{title}.txt` under `dir` and returns its path.
pub async fn save_letter(dir: &Path, job: &JobRow, text: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create '{}'", dir.display()))?;

    let company = sanitize_filename(or_placeholder(&job.company, "company"));
    let title = sanitize_filename(or_placeholder(&job.title, "job"));
    let path = dir.join(format!("cover_letter_{company}_{title}.txt"));
    tokio::fs::write(&path, text)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    info!("Cover letter saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use sqlx::types::Json;

    use super::*;
    use crate::letters::cache::MemoryLetterCache;
    use crate::llm_client::LlmSettings;

    fn job() -> JobRow {
        JobRow {
            id: 7,
            title: "Backend Engineer".to_string(),
            company: "Acme/Co.".to_string(),
            location: "Melbourne".to_string(),
            salary: None,
            description: "Rust and PostgreSQL".to_string(),
            url: "https://jobs.example/7".to_string(),
            source: "seek".to_string(),
            deadline: None,
            scraped_at: Utc::now(),
            expired: false,
            applied: false,
            applied_at: None,
            match_score: None,
        }
    }

    fn resume(skills: &[&str]) -> ResumeRow {
        ResumeRow {
            id: 1,
            file_name: "cv.txt".to_string(),
            skills: Json(skills.iter().map(|s| s.to_string()).collect()),
            experience: Json(vec!["Built payment APIs".to_string()]),
            education: Json(Vec::new()),
            email: None,
            phone: None,
            raw_text: String::new(),
            created_at: Utc::now(),
        }
    }

    fn profile() -> UserSettings {
        UserSettings {
            name: "Jordan Smith".to_string(),
            email: "jordan@example.com".to_string(),
            phone: "0400 000 000".to_string(),
            ..UserSettings::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    fn llm_for(server: &mockito::Server) -> LlmClient {
        let settings = LlmSettings {
            retry_backoff: Duration::ZERO,
            ..LlmSettings::new(server.url(), "gpt-3.5-turbo")
        };
        LlmClient::new("sk-test-0123456789abcdefghij".to_string(), settings).unwrap()
    }

    #[test]
    fn test_fallback_letter_uses_top_five_skills_and_profile() {
        let skills: Vec<String> = ["a1", "b2", "c3", "d4", "e5", "f6"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let letter = fallback_letter(&job(), &skills, &profile(), today());

        assert!(letter.starts_with("March 04, 2025"));
        assert!(letter.contains("Backend Engineer position at Acme/Co."));
        assert!(letter.contains("a1, b2, c3, d4, e5"));
        assert!(!letter.contains("f6"));
        assert!(letter.ends_with("Jordan Smith\njordan@example.com\n0400 000 000"));
    }

    #[test]
    fn test_fallback_letter_placeholders_for_blank_profile() {
        let letter = fallback_letter(&job(), &[], &UserSettings::default(), today());
        assert!(letter.contains("Your Name"));
        assert!(letter.contains("I am excited to apply"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Acme/Co. Pty Ltd"), "AcmeCo_Pty_Ltd");
        assert_eq!(sanitize_filename("  Senior Dev-Ops!  "), "Senior_Dev-Ops");
    }

    #[tokio::test]
    async fn test_no_client_gives_fallback() {
        let cache = MemoryLetterCache::default();
        let letter =
            generate_cover_letter(None, &cache, &job(), Some(&resume(&["rust"])), &profile(), today())
                .await;
        assert_eq!(letter.source, LetterSource::Fallback);
        assert!(letter.text.contains("rust"));
    }

    #[tokio::test]
    async fn test_ai_letter_is_cached_for_next_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Dear Acme team"}}]}"#)
            .expect(1)
            .create_async()
            .await;
        let llm = llm_for(&server);
        let cache = MemoryLetterCache::default();
        let cv = resume(&["rust", "postgresql"]);

        let first =
            generate_cover_letter(Some(&llm), &cache, &job(), Some(&cv), &profile(), today()).await;
        let second =
            generate_cover_letter(Some(&llm), &cache, &job(), Some(&cv), &profile(), today()).await;

        assert_eq!(first.source, LetterSource::Ai);
        assert_eq!(first.text, "Dear Acme team");
        assert_eq!(second.source, LetterSource::Cache);
        assert_eq!(second.text, first.text);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_failure_falls_back() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(400)
            .with_body(r#"{"error":{"message":"bad request"}}"#)
            .create_async()
            .await;
        let llm = llm_for(&server);
        let cache = MemoryLetterCache::default();

        let letter =
            generate_cover_letter(Some(&llm), &cache, &job(), None, &profile(), today()).await;
        assert_eq!(letter.source, LetterSource::Fallback);
        assert!(letter.text.contains("Dear Hiring Manager"));
    }

    #[tokio::test]
    async fn test_save_letter_writes_sanitised_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_letter(dir.path(), &job(), "Hello").await.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "cover_letter_AcmeCo_Backend_Engineer.txt"
        );
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "Hello");
    }
}
