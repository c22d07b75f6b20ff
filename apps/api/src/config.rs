use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Process configuration loaded from environment variables (and `.env` when present).
/// Everything has a default except the optional Redis and OpenAI credentials.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Letter cache backend. `None` keeps the cache in memory.
    pub redis_url: Option<String>,
    /// AI letters are disabled when this is missing.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub port: u16,
    pub rust_log: String,
    pub settings_path: PathBuf,
    pub cover_letter_dir: PathBuf,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://jobscout.db"),
            redis_url: optional_env("REDIS_URL"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            settings_path: PathBuf::from(env_or("SETTINGS_PATH", "jobscout_settings.json")),
            cover_letter_dir: PathBuf::from(env_or("COVER_LETTER_DIR", "cover_letters")),
            request_timeout: Duration::from_secs(
                parse_env("REQUEST_TIMEOUT_SECS", 30u64)
                    .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            user_agent: env_or("USER_AGENT", DEFAULT_USER_AGENT),
        })
    }
}

/// Reads `key`, treating unset and blank values alike.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
