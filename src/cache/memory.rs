use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::RwLock, time::Instant};

use super::KeyValueStore;
use crate::error::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process key-value store with Redis-like expiry semantics.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Uses `tokio::time::Instant`, so tests with a paused clock control expiry.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` without an expiry (Redis `SET` without `EX`).
    pub async fn set(&self, key: &str, value: &[u8]) {
        self.inner.write().await.insert(
            key.to_owned(),
            Entry { value: value.to_vec(), expires_at: None },
        );
    }

    pub async fn key_count(&self) -> usize {
        let now = Instant::now();
        self.inner.read().await.values().filter(|e| e.is_live(now)).count()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        Ok(self
            .inner
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut guard = self.inner.write().await;
        // Drop anything that has already expired while we hold the lock.
        let now = Instant::now();
        guard.retain(|_, e| e.is_live(now));
        guard.insert(
            key.to_owned(),
            Entry { value: value.to_vec(), expires_at: Some(now + ttl) },
        );
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let now = Instant::now();
        let guard = self.inner.read().await;
        let Some(entry) = guard.get(key).filter(|e| e.is_live(now)) else {
            return Ok(None);
        };
        // Whole seconds, rounded the way Redis `TTL` rounds.
        Ok(entry.expires_at.map(|at| {
            let ms = at.saturating_duration_since(now).as_millis() as u64;
            Duration::from_secs((ms + 500) / 1000)
        }))
    }
}
