//! Cover-letter cache keyed by a digest of the job and the applicant's skills.
//!
//! Redis is used when `REDIS_URL` is set; otherwise letters live in process memory.
//! Both expire entries after [`LETTER_TTL`].

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const LETTER_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const KEY_PREFIX: &str = "jobscout:letter:";
const DESCRIPTION_KEY_CHARS: usize = 500;

#[async_trait]
pub trait LetterCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, letter: &str) -> Result<()>;
    fn backend(&self) -> &'static str;
}

/// Fields are in alphabetical order so the serialised form is canonical.
#[derive(Serialize)]
struct KeyMaterial<'a> {
    company_name: &'a str,
    description: String,
    job_title: &'a str,
    skills: &'a [String],
}

/// SHA-256 hex digest of the title, company, first 500 description chars and skills.
pub fn cache_key(job_title: &str, company: &str, description: &str, skills: &[String]) -> String {
    let material = KeyMaterial {
        company_name: company,
        description: description.chars().take(DESCRIPTION_KEY_CHARS).collect(),
        job_title,
        skills,
    };
    let canonical = serde_json::to_vec(&material).unwrap_or_default();
    hex::encode(Sha256::digest(&canonical))
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisLetterCache {
    client: redis::Client,
    ttl: Duration,
}

impl RedisLetterCache {
    pub fn open(url: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
            ttl: LETTER_TTL,
        })
    }
}

#[async_trait]
impl LetterCache for RedisLetterCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(format!("{KEY_PREFIX}{key}"))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, letter: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(format!("{KEY_PREFIX}{key}"))
            .arg(letter)
            .arg("EX")
            .arg(self.ttl.as_secs())
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-process
// ────────────────────────────────────────────────────────────────────────────

pub struct MemoryLetterCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    ttl: Duration,
}

impl MemoryLetterCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for MemoryLetterCache {
    fn default() -> Self {
        Self::new(LETTER_TTL)
    }
}

#[async_trait]
impl LetterCache for MemoryLetterCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        if let Some((letter, stored)) = entries.get(key) {
            if stored.elapsed() < self.ttl {
                return Ok(Some(letter.clone()));
            }
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, letter: &str) -> Result<()> {
        let ttl = self.ttl;
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, stored)| stored.elapsed() < ttl);
        entries.insert(key.to_string(), (letter.to_string(), Instant::now()));
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_hex() {
        let skills = vec!["rust".to_string()];
        let a = cache_key("Engineer", "Acme", "Build things", &skills);
        let b = cache_key("Engineer", "Acme", "Build things", &skills);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_ignores_description_past_limit() {
        let base = "x".repeat(DESCRIPTION_KEY_CHARS);
        let skills = Vec::new();
        assert_eq!(
            cache_key("t", "c", &format!("{base}tail one"), &skills),
            cache_key("t", "c", &format!("{base}tail two"), &skills)
        );
        assert_ne!(
            cache_key("t", "c", &base, &skills),
            cache_key("t", "c", &base, &["go".to_string()])
        );
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryLetterCache::default();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.put("k", "Dear team").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("Dear team"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_expires_entries() {
        let cache = MemoryLetterCache::new(Duration::from_secs(60));
        cache.put("k", "letter").await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_expired_entries() {
        let cache = MemoryLetterCache::new(Duration::from_secs(60));
        cache.put("a", "first").await.unwrap();
        cache.put("b", "second").await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.put("c", "third").await.unwrap();

        let entries = cache.entries.lock().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("c"));
    }
}
