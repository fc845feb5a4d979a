//! Whole-page response cache.
//!
//! Rendered pages are cached by request URI for a fixed TTL. Entries are never
//! refreshed when the underlying data changes; a deleted post stays visible in
//! a cached page until the entry expires or the cache is cleared.
//!
//! Two backends are provided:
//!
//! - [`MemoryPageCache`]: per-process map, the default
//! - [`RedisPageCache`]: shared between processes through Redis

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use fred::types::Expiration;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::{AppError, AppResult};

/// A cached rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if the page had one.
    pub content_type: Option<String>,
    /// Response body.
    pub body: String,
}

/// Page cache abstraction injected into the HTTP layer.
#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    /// Look up a cached page.
    async fn get(&self, key: &str) -> AppResult<Option<CachedPage>>;

    /// Store a page for `ttl`.
    async fn set(&self, key: &str, page: CachedPage, ttl: Duration) -> AppResult<()>;

    /// Drop a single cached page.
    async fn invalidate(&self, key: &str) -> AppResult<()>;

    /// Drop every cached page.
    async fn clear(&self) -> AppResult<()>;
}

/// Shared page cache handle.
pub type SharedPageCache = Arc<dyn PageCache>;

#[derive(Debug, Clone)]
struct Entry {
    page: CachedPage,
    expires_at: Instant,
}

/// In-process page cache.
#[derive(Clone, Default)]
pub struct MemoryPageCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryPageCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> AppResult<Option<CachedPage>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => {
                    debug!(key = %key, "Page cache hit");
                    return Ok(Some(entry.page.clone()));
                }
                Some(_) => {}
                None => {
                    debug!(key = %key, "Page cache miss");
                    return Ok(None);
                }
            }
        }

        // Expired: evict under the write lock, re-checking in case of a concurrent set.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        debug!(key = %key, "Page cache entry expired");
        Ok(None)
    }

    async fn set(&self, key: &str, page: CachedPage, ttl: Duration) -> AppResult<()> {
        let entry = Entry {
            page,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Redis-backed page cache.
///
/// Keys embed a generation number; [`PageCache::clear`] bumps the generation so
/// every previously stored page becomes unreachable and ages out on its own TTL.
#[derive(Clone)]
pub struct RedisPageCache {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisPageCache {
    /// Create a new Redis page cache.
    #[must_use]
    pub const fn new(redis: Arc<RedisClient>, prefix: String) -> Self {
        Self { redis, prefix }
    }

    fn generation_key(&self) -> String {
        format!("{}:page:generation", self.prefix)
    }

    fn page_key(&self, generation: i64, key: &str) -> String {
        format!("{}:page:{generation}:{key}", self.prefix)
    }

    async fn generation(&self) -> AppResult<i64> {
        let generation: Option<i64> = self
            .redis
            .get(self.generation_key())
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        Ok(generation.unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> AppResult<Option<CachedPage>> {
        let generation = self.generation().await?;
        let raw: Option<String> = self
            .redis
            .get(self.page_key(generation, key))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        match raw {
            Some(json) => {
                debug!(key = %key, "Page cache hit");
                serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|e| AppError::Cache(e.to_string()))
            }
            None => {
                debug!(key = %key, "Page cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, page: CachedPage, ttl: Duration) -> AppResult<()> {
        let generation = self.generation().await?;
        let json = serde_json::to_string(&page).map_err(|e| AppError::Cache(e.to_string()))?;

        self.redis
            .set::<(), _, _>(
                self.page_key(generation, key),
                json,
                Some(Expiration::EX(ttl.as_secs().max(1) as i64)),
                None,
                false,
            )
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }

    async fn invalidate(&self, key: &str) -> AppResult<()> {
        let generation = self.generation().await?;
        self.redis
            .del::<(), _>(self.page_key(generation, key))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }

    async fn clear(&self) -> AppResult<()> {
        self.redis
            .incr::<i64, _>(self.generation_key())
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(body: &str) -> CachedPage {
        CachedPage {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryPageCache::new();
        cache
            .set("/", page("feed"), Duration::from_secs(20))
            .await
            .unwrap();

        assert_eq!(cache.get("/").await.unwrap(), Some(page("feed")));
        assert_eq!(cache.get("/?page=2").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryPageCache::new();
        cache
            .set("/", page("feed"), Duration::from_secs(20))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(19)).await;
        assert!(cache.get("/").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("/").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = MemoryPageCache::new();
        let ttl = Duration::from_secs(20);
        cache.set("/", page("a"), ttl).await.unwrap();
        cache.set("/?page=2", page("b"), ttl).await.unwrap();

        cache.invalidate("/").await.unwrap();
        assert!(cache.get("/").await.unwrap().is_none());
        assert_eq!(cache.len().await, 1);

        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_redis_key_layout() {
        let config = fred::types::config::Config::default();
        let client = RedisClient::new(config, None, None, None);
        let cache = RedisPageCache::new(Arc::new(client), "yatube".to_string());

        assert_eq!(cache.generation_key(), "yatube:page:generation");
        assert_eq!(cache.page_key(3, "/?page=2"), "yatube:page:3:/?page=2");
    }
}
