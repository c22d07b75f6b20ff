//! Match scoring: a pluggable, trait-based scorer that ranks listings against a résumé.
//!
//! Default: `TfIdfSkillScorer` (pure Rust, deterministic). `AppState` holds an
//! `Arc<dyn MatchScorer>`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::matching::tfidf::{self, TfIdfModel};
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::resume::skills::SkillMatcher;

pub const SKILL_WEIGHT: f64 = 0.7;
pub const TEXT_WEIGHT: f64 = 0.3;
pub const DEFAULT_THRESHOLD: f64 = 70.0;

/// Résumé skills are repeated so they outweigh incidental prose.
const RESUME_SKILL_REPEAT: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl MatchTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            MatchTier::Excellent
        } else if score >= 60.0 {
            MatchTier::Good
        } else if score >= 40.0 {
            MatchTier::Fair
        } else {
            MatchTier::Poor
        }
    }
}

pub fn meets_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMatch {
    pub job_id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub match_percentage: f64, // 0 – 100, two decimals
    pub skill_match: f64,      // 0 – 100
    pub text_similarity: f64,  // 0 – 1
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub tier: MatchTier,
}

/// A listing that could not be scored, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedJob {
    pub job_id: i64,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// Every scored listing, best first.
    pub ranked: Vec<JobMatch>,
    pub skipped: Vec<SkippedJob>,
    pub scorer_backend: String,
}

/// Everything a scorer needs; owned so it can move onto a blocking thread.
pub struct MatchInput {
    pub resume: ResumeRow,
    pub jobs: Vec<JobRow>,
    pub skills: SkillMatcher,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn score(&self, input: MatchInput) -> Result<MatchReport, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// TfIdfSkillScorer (default implementation)
// ────────────────────────────────────────────────────────────────────────────

/// Skill overlap blended with TF-IDF text similarity.
///
/// Algorithm:
/// 1. Corpus = every scorable job description + the résumé document.
/// 2. text_similarity = cosine(résumé vector, job vector)
/// 3. skill_match = |job skills ∩ résumé skills| / |job skills| × 100
/// 4. match = 0.7 × skill_match + 0.3 × text_similarity × 100
pub struct TfIdfSkillScorer;

#[async_trait]
impl MatchScorer for TfIdfSkillScorer {
    async fn score(&self, input: MatchInput) -> Result<MatchReport, AppError> {
        tokio::task::spawn_blocking(move || compute_matches(&input))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("matching task failed: {e}")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core algorithm
// ────────────────────────────────────────────────────────────────────────────

/// Skills (three times), experience paragraphs and education paragraphs.
pub fn resume_document(resume: &ResumeRow) -> String {
    let skills = resume.skills.0.join(" ");
    let mut parts: Vec<&str> = Vec::new();
    for _ in 0..RESUME_SKILL_REPEAT {
        parts.push(&skills);
    }
    parts.extend(resume.experience.0.iter().map(String::as_str));
    parts.extend(resume.education.0.iter().map(String::as_str));
    parts.join("\n")
}

pub fn combine_scores(skill_match: f64, text_similarity: f64) -> f64 {
    let raw = SKILL_WEIGHT * skill_match + TEXT_WEIGHT * text_similarity * 100.0;
    round2(raw.clamp(0.0, 100.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Best first; equal scores put the most recently scraped listing first, then lower id.
pub fn rank_matches(matches: &mut [JobMatch]) {
    matches.sort_by(|a, b| {
        b.match_percentage
            .total_cmp(&a.match_percentage)
            .then_with(|| b.scraped_at.cmp(&a.scraped_at))
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
}

pub fn compute_matches(input: &MatchInput) -> MatchReport {
    let mut skipped = Vec::new();
    let mut scorable: Vec<(&JobRow, Vec<String>)> = Vec::new();

    for job in &input.jobs {
        if job.description.trim().is_empty() {
            skipped.push(skip(job, "empty description"));
            continue;
        }
        let terms = tfidf::terms(&job.description);
        if terms.is_empty() {
            skipped.push(skip(job, "no usable terms in description"));
            continue;
        }
        scorable.push((job, terms));
    }

    let resume_terms = tfidf::terms(&resume_document(&input.resume));
    let mut corpus: Vec<Vec<String>> = scorable.iter().map(|(_, t)| t.clone()).collect();
    corpus.push(resume_terms.clone());
    let model = TfIdfModel::fit(&corpus);
    debug!(
        "Fitted TF-IDF over {} documents ({} terms)",
        corpus.len(),
        model.vocabulary_size()
    );
    let resume_vector = model.vectorize(&resume_terms);

    let resume_skills: BTreeSet<String> = input
        .resume
        .skills
        .0
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let mut ranked: Vec<JobMatch> = scorable
        .into_iter()
        .map(|(job, terms)| {
            let text_similarity = tfidf::cosine(&resume_vector, &model.vectorize(&terms));
            let job_skills = input.skills.extract(&job.description);
            let (matching_skills, missing_skills): (Vec<String>, Vec<String>) = job_skills
                .into_iter()
                .partition(|skill| resume_skills.contains(skill));

            let required = matching_skills.len() + missing_skills.len();
            let skill_match = if required == 0 {
                0.0
            } else {
                matching_skills.len() as f64 / required as f64 * 100.0
            };
            let match_percentage = combine_scores(skill_match, text_similarity);

            JobMatch {
                job_id: job.id,
                title: job.title.clone(),
                company: job.company.clone(),
                location: job.location.clone(),
                url: job.url.clone(),
                scraped_at: job.scraped_at,
                match_percentage,
                skill_match: round2(skill_match),
                text_similarity,
                matching_skills,
                missing_skills,
                tier: MatchTier::from_score(match_percentage),
            }
        })
        .collect();

    rank_matches(&mut ranked);

    MatchReport {
        ranked,
        skipped,
        scorer_backend: "tfidf-skill".to_string(),
    }
}

fn skip(job: &JobRow, reason: &str) -> SkippedJob {
    SkippedJob {
        job_id: job.id,
        title: job.title.clone(),
        reason: reason.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
