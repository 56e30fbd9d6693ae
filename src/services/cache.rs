//! Read-through cache with prefix-based bulk invalidation
//!
//! Values are opaque bytes (JSON in practice, see [`get_json`] / [`set_json`]).
//! Keys start with the entity kind, so every entry derived from an entity can
//! be dropped with a single `delete_by_pattern(kind)` call after a write.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{CacheBackend, CacheConfig};

/// Cache key builders. The first segment is the prefix used for invalidation.
pub mod keys {
    use uuid::Uuid;

    pub const PRICE_PREFIX: &str = "price";
    pub const HARVEST_PREFIX: &str = "harvest";

    pub fn price(id: Uuid) -> String {
        format!("price_{}", id)
    }

    pub fn price_list(page: u64, limit: u64) -> String {
        format!("price_list_page_{}_limit_{}", page, limit)
    }

    pub fn price_history(commodity_id: Uuid, location_id: Uuid) -> String {
        format!("price_history_{}_{}", commodity_id, location_id)
    }

    pub fn harvest_list(land_commodity_id: Uuid, page: u64, limit: u64) -> String {
        format!(
            "harvest_list_{}_page_{}_limit_{}",
            land_commodity_id, page, limit
        )
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Removes every entry whose key starts with `prefix` and returns how many were removed
    async fn delete_by_pattern(&self, prefix: &str) -> Result<u64, CacheError>;
}

pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn Cache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(value)?;
    cache.set(key, bytes, ttl).await
}

#[derive(Clone)]
struct CachedValue {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Honours the TTL each entry was stored with
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by moka
#[derive(Clone)]
pub struct MemoryCache {
    inner: moka::future::Cache<String, CachedValue>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { inner }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.inner.get(key).await.map(|value| value.bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.inner
            .insert(
                key.to_string(),
                CachedValue {
                    bytes: value.into(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete_by_pattern(&self, prefix: &str) -> Result<u64, CacheError> {
        let matching: Vec<Arc<String>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();

        for key in &matching {
            self.inner.invalidate(key.as_str()).await;
        }

        debug!(prefix = %prefix, removed = matching.len(), "Invalidated cache entries");
        Ok(matching.len() as u64)
    }
}

/// Shared cache backed by Redis
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!(url = %url, "Connected to Redis cache");

        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete_by_pattern(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);

        let matching: Vec<String> = {
            let mut iter = conn.scan_match::<_, String>(&pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if matching.is_empty() {
            return Ok(0);
        }

        let removed: u64 = conn.del(&matching).await?;
        debug!(prefix = %prefix, removed, "Invalidated cache entries");
        Ok(removed)
    }
}

/// Builds the cache selected by `config.backend`
pub async fn build_cache(config: &CacheConfig) -> Result<Arc<dyn Cache>, CacheError> {
    match &config.backend {
        CacheBackend::Memory => {
            info!(max_capacity = config.max_capacity, "Using in-process cache");
            Ok(Arc::new(MemoryCache::new(config.max_capacity)))
        }
        CacheBackend::Redis { url } => Ok(Arc::new(RedisCache::connect(url).await?)),
    }
}
