pub mod memory;
pub mod redis_store;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::error::CacheError;

pub use self::{memory::MemoryStore, redis_store::RedisStore};

/// Key under which the aggregate temperature is cached.
pub const TEMPERATURE_KEY: &str = "temperature";

/// Minimal key-value capability the service needs from its cache.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Overwrite `key` with `value`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remaining time to live. `None` when the key is absent or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;
}

/// Gateway over the single cached aggregate.
///
/// Owns the key and the expiration policy so the read path, the readiness
/// check and the snapshot loop all agree on both.
#[derive(Clone)]
pub struct TemperatureCache {
    store: Arc<dyn KeyValueStore>,
    expiration: Duration,
}

impl TemperatureCache {
    pub fn new(store: Arc<dyn KeyValueStore>, expiration: Duration) -> Self {
        Self { store, expiration }
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Cached aggregate, if any. A stored value that is not a decimal integer
    /// is reported as an error rather than a miss.
    pub async fn get(&self) -> Result<Option<i64>, CacheError> {
        let Some(bytes) = self.store.get(TEMPERATURE_KEY).await? else {
            return Ok(None);
        };
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| CacheError("cached temperature is not UTF-8".to_owned()))?;
        text.trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError(format!("cached temperature is not an integer: {text:?}")))
    }

    pub async fn put(&self, value: i64) -> Result<(), CacheError> {
        self.store
            .set_ex(TEMPERATURE_KEY, value.to_string().as_bytes(), self.expiration)
            .await
    }

    /// Remaining TTL of the cached aggregate. Zero counts as no signal.
    pub async fn remaining_ttl(&self) -> Result<Option<Duration>, CacheError> {
        Ok(self
            .store
            .ttl(TEMPERATURE_KEY)
            .await?
            .filter(|ttl| !ttl.is_zero()))
    }

    /// A value is present and its TTL lies strictly inside `(0, expiration)`.
    pub async fn is_fresh(&self) -> Result<bool, CacheError> {
        if self.get().await?.is_none() {
            return Ok(false);
        }
        let ttl = self.remaining_ttl().await?;
        Ok(ttl.is_some_and(|ttl| ttl < self.expiration))
    }
}
