//! Polite HTTP fetching: random pre-request delay, bounded concurrency, retries with
//! linear backoff and optional robots.txt checks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};
use url::{Position, Url};

use crate::scraping::robots::RobotsRules;
use crate::settings::UserSettings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{0} is disallowed by robots.txt")]
    Disallowed(String),

    #[error("fetcher is shut down")]
    Closed,
}

/// Request pacing taken from the user's settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub retry_count: u32,
    pub max_concurrent: usize,
    pub respect_robots_txt: bool,
}

impl FetchPolicy {
    pub fn from_settings(settings: &UserSettings) -> Self {
        let min = settings.min_delay_secs.max(0.0);
        let max = settings.max_delay_secs.max(min);
        Self {
            min_delay: Duration::from_secs_f64(min),
            max_delay: Duration::from_secs_f64(max),
            retry_count: settings.retry_count,
            max_concurrent: settings.max_concurrent_requests.max(1),
            respect_robots_txt: settings.respect_robots_txt,
        }
    }

    /// Uniformly random pause in `[min_delay, max_delay]`.
    pub fn jitter(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let secs = rand::thread_rng()
            .gen_range(self.min_delay.as_secs_f64()..=self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.min_delay * attempt
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    policy: FetchPolicy,
    permits: Arc<Semaphore>,
    robots: Arc<Mutex<HashMap<String, Arc<RobotsRules>>>>,
}

impl Fetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        policy: FetchPolicy,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(policy.max_concurrent)),
            policy,
            robots: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// GETs `url` and returns the body. 429 and 5xx responses and transport errors are
    /// retried; any other non-success status fails immediately.
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        if self.policy.respect_robots_txt && !self.robots_allows(url).await {
            return Err(FetchError::Disallowed(url.to_string()));
        }

        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Closed)?;
        let attempts = self.policy.retry_count.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let delay = self.policy.jitter();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            debug!("GET {url} (attempt {attempt}/{attempts})");
            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.text().await?);
                }
                Ok(response) => {
                    let status = response.status();
                    let error = FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    };
                    if !is_retryable(status) {
                        return Err(error);
                    }
                    warn!("{error}, attempt {attempt}/{attempts}");
                    last_error = Some(error);
                }
                Err(e) => {
                    warn!("Request to {url} failed: {e}, attempt {attempt}/{attempts}");
                    last_error = Some(FetchError::Http(e));
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.policy.backoff(attempt)).await;
            }
        }

        Err(last_error.unwrap_or(FetchError::Closed))
    }

    async fn robots_allows(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let cached = self.robots.lock().await.get(&origin).cloned();
        let rules = match cached {
            Some(rules) => rules,
            None => {
                let rules = Arc::new(self.fetch_robots(&origin).await);
                self.robots.lock().await.insert(origin, rules.clone());
                rules
            }
        };
        rules.is_allowed(&url[Position::BeforePath..])
    }

    async fn fetch_robots(&self, origin: &str) -> RobotsRules {
        let robots_url = format!("{origin}/robots.txt");
        let response = match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("{robots_url} returned {}, allowing all", response.status());
                return RobotsRules::allow_all();
            }
            Err(e) => {
                debug!("{robots_url} unreachable ({e}), allowing all");
                return RobotsRules::allow_all();
            }
        };

        match response.text().await {
            Ok(body) => RobotsRules::parse(&body),
            Err(_) => RobotsRules::allow_all(),
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
