use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::letters::cache::LetterCache;
use crate::llm_client::LlmClient;
use crate::matching::scorer::MatchScorer;
use crate::settings::UserSettings;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// `None` when no usable OpenAI key is configured; letters then use the template.
    pub llm: Option<LlmClient>,
    pub letter_cache: Arc<dyn LetterCache>,
    /// Pluggable match scorer. Default: TfIdfSkillScorer.
    pub match_scorer: Arc<dyn MatchScorer>,
    /// Mirrors the settings file; replaced wholesale on every successful save.
    pub settings: Arc<RwLock<UserSettings>>,
    pub config: Config,
}

/// In-memory database, memory letter cache, no language model and default settings.
#[cfg(test)]
pub async fn test_state() -> AppState {
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::letters::cache::MemoryLetterCache;
    use crate::matching::scorer::TfIdfSkillScorer;

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        redis_url: None,
        openai_api_key: None,
        openai_base_url: "http://127.0.0.1:9".to_string(),
        openai_model: "gpt-3.5-turbo".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        settings_path: PathBuf::from("jobscout_settings.test.json"),
        cover_letter_dir: PathBuf::from("cover_letters_test"),
        request_timeout: Duration::from_secs(5),
        user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
    };

    AppState {
        db: crate::db::test_pool().await,
        llm: None,
        letter_cache: Arc::new(MemoryLetterCache::default()),
        match_scorer: Arc::new(TfIdfSkillScorer),
        settings: Arc::new(RwLock::new(UserSettings::default())),
        config,
    }
}
