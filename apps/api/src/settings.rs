//! User profile and search defaults, persisted as a JSON file.
//!
//! A missing file yields [`UserSettings::default`]. Values are validated before they are
//! written; a file edited by hand into an invalid state still loads, and the first save
//! through the API will reject it.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::matching::scorer::DEFAULT_THRESHOLD;
use crate::scraping::sites::Site;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Added to the built-in skill vocabulary.
    pub skills: Vec<String>,
    pub search_terms: Vec<String>,
    pub location: String,
    pub job_sites: Vec<String>,
    pub pages_per_site: u32,
    pub max_jobs: usize,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub max_concurrent_requests: usize,
    pub retry_count: u32,
    pub respect_robots_txt: bool,
    pub match_threshold: f64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            skills: Vec::new(),
            search_terms: vec!["software developer".to_string()],
            location: "Australia".to_string(),
            job_sites: Site::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            pages_per_site: 2,
            max_jobs: 50,
            min_delay_secs: 2.0,
            max_delay_secs: 5.0,
            max_concurrent_requests: 5,
            retry_count: 3,
            respect_robots_txt: true,
            match_threshold: DEFAULT_THRESHOLD,
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
    })
}

impl UserSettings {
    /// Returns every problem found; an empty list means the settings can be saved.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.email.is_empty() && !email_pattern().is_match(self.email.trim()) {
            errors.push(format!("email '{}' is not a valid address", self.email));
        }
        if self.min_delay_secs < 0.0 || self.max_delay_secs < 0.0 {
            errors.push("delays must not be negative".to_string());
        }
        if self.min_delay_secs > self.max_delay_secs {
            errors.push("min_delay_secs must not exceed max_delay_secs".to_string());
        }
        if self.pages_per_site == 0 {
            errors.push("pages_per_site must be at least 1".to_string());
        }
        if self.max_jobs == 0 {
            errors.push("max_jobs must be at least 1".to_string());
        }
        if self.max_concurrent_requests == 0 {
            errors.push("max_concurrent_requests must be at least 1".to_string());
        }
        if !(0.0..=100.0).contains(&self.match_threshold) {
            errors.push("match_threshold must be between 0 and 100".to_string());
        }
        for site in &self.job_sites {
            if site.parse::<Site>().is_err() {
                errors.push(format!("unknown job site '{site}'"));
            }
        }

        errors
    }

    /// Configured sites, silently dropping names that do not parse.
    pub fn sites(&self) -> Vec<Site> {
        self.job_sites
            .iter()
            .filter_map(|s| s.parse::<Site>().ok())
            .collect()
    }
}

pub async fn load_settings(path: &Path) -> Result<UserSettings> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("Settings file '{}' is not valid JSON", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No settings file at {}, using defaults", path.display());
            Ok(UserSettings::default())
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to read settings file '{}'", path.display()))
        }
    }
}

/// Writes through a temporary sibling file so a crash never leaves half a document.
pub async fn save_settings(path: &Path, settings: &UserSettings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }

    let body = serde_json::to_string_pretty(settings)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("Failed to write '{}'", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace '{}'", path.display()))?;

    info!("Settings saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(UserSettings::default().validate().is_empty());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let settings = UserSettings {
            email: "not-an-email".to_string(),
            min_delay_secs: 6.0,
            max_delay_secs: 1.0,
            pages_per_site: 0,
            match_threshold: 120.0,
            job_sites: vec!["monster".to_string()],
            ..UserSettings::default()
        };
        let errors = settings.validate();
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("monster")));
    }

    #[test]
    fn test_sites_skips_unknown_names() {
        let settings = UserSettings {
            job_sites: vec!["seek".to_string(), "bogus".to_string(), "LinkedIn".to_string()],
            ..UserSettings::default()
        };
        assert_eq!(settings.sites(), vec![Site::Seek, Site::LinkedIn]);
    }

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_settings(&dir.path().join("absent.json")).await.unwrap();
        assert_eq!(loaded, UserSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = UserSettings {
            name: "Sam Lee".to_string(),
            email: "sam@example.com".to_string(),
            skills: vec!["elixir".to_string()],
            ..UserSettings::default()
        };

        save_settings(&path, &settings).await.unwrap();
        let loaded = load_settings(&path).await.unwrap();
        assert_eq!(loaded, settings);
    }

    #[tokio::test]
    async fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"name":"Ada","pages_per_site":4}"#)
            .await
            .unwrap();

        let loaded = load_settings(&path).await.unwrap();
        assert_eq!(loaded.name, "Ada");
        assert_eq!(loaded.pages_per_site, 4);
        assert_eq!(loaded.match_threshold, 70.0);
    }
}
