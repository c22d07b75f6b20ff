mod applications;
mod config;
mod db;
mod errors;
mod jobs;
mod letters;
mod llm_client;
mod matching;
mod models;
mod resume;
mod routes;
mod scraping;
mod settings;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::letters::cache::{LetterCache, MemoryLetterCache, RedisLetterCache};
use crate::llm_client::{LlmClient, LlmSettings};
use crate::matching::scorer::TfIdfSkillScorer;
use crate::routes::build_router;
use crate::settings::load_settings;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "jobscout", version, about = "Job listing scraper, matcher and cover-letter writer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Flag listings whose closing date has passed
    CheckExpired,
    /// Delete expired listings first seen more than N days ago
    DeleteExpired {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Opening the pool also applies pending migrations
    let db = create_pool(&config.database_url).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::CheckExpired => {
            let count = jobs::repository::check_expired_jobs(&db, Utc::now().date_naive()).await?;
            info!("{count} listings marked expired");
            Ok(())
        }
        Command::DeleteExpired { days } => {
            anyhow::ensure!(days >= 0, "--days must not be negative");
            let cutoff = Utc::now() - Duration::days(days);
            let count = jobs::repository::delete_expired_jobs(&db, cutoff).await?;
            info!("{count} expired listings deleted");
            Ok(())
        }
        Command::Migrate => {
            info!("Database is up to date");
            Ok(())
        }
    }
}

async fn serve(config: Config, db: sqlx::SqlitePool) -> Result<()> {
    info!("Starting Jobscout API v{}", env!("CARGO_PKG_VERSION"));

    let settings = load_settings(&config.settings_path).await?;
    for problem in settings.validate() {
        warn!("Settings file: {problem}");
    }

    let llm = build_llm_client(&config);
    let letter_cache = build_letter_cache(&config);
    let match_scorer = Arc::new(TfIdfSkillScorer);

    let state = AppState {
        db,
        llm,
        letter_cache,
        match_scorer,
        settings: Arc::new(RwLock::new(settings)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_llm_client(config: &Config) -> Option<LlmClient> {
    let Some(key) = config.openai_api_key.clone() else {
        info!("OPENAI_API_KEY not set, cover letters will use the template");
        return None;
    };
    let settings = LlmSettings::new(&config.openai_base_url, &config.openai_model);
    match LlmClient::new(key, settings) {
        Ok(client) => {
            info!("LLM client initialized (model: {})", client.model());
            Some(client)
        }
        Err(e) => {
            warn!("AI cover letters disabled: {e}");
            None
        }
    }
}

fn build_letter_cache(config: &Config) -> Arc<dyn LetterCache> {
    if let Some(url) = &config.redis_url {
        match RedisLetterCache::open(url) {
            Ok(cache) => {
                info!("Letter cache: redis");
                return Arc::new(cache);
            }
            Err(e) => warn!("Invalid REDIS_URL, falling back to memory cache: {e:#}"),
        }
    }
    info!("Letter cache: memory");
    Arc::new(MemoryLetterCache::default())
}
