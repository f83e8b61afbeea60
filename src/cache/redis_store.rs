use std::{future::Future, time::Duration};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::info;

use super::KeyValueStore;
use crate::error::CacheError;

/// Upper bound for a single cache round-trip, including connecting.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis-backed [`KeyValueStore`].
///
/// The connection is opened lazily on first use, so a Redis outage at boot
/// shows up as a readiness error instead of a failed start. Once opened, the
/// `ConnectionManager` reconnects on its own.
pub struct RedisStore {
    client: Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisStore {
    pub fn new(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: Client::open(url)?,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                info!("Connecting to Redis");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(conn.clone())
    }
}

async fn bounded<T, F>(fut: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::time::timeout(OP_TIMEOUT, fut)
        .await
        .map_err(|_| CacheError(format!("no reply from Redis within {OP_TIMEOUT:?}")))?
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        bounded(async {
            let mut conn = self.connection().await?;
            Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        bounded(async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
            Ok(())
        })
        .await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        bounded(async {
            let mut conn = self.connection().await?;
            let secs: i64 = conn.ttl(key).await?;
            Ok(ttl_from_reply(secs))
        })
        .await
    }
}

/// Redis `TTL` replies `-2` for a missing key and `-1` for a key without
/// expiry; neither carries a usable remaining lifetime.
fn ttl_from_reply(secs: i64) -> Option<Duration> {
    u64::try_from(secs).ok().map(Duration::from_secs)
}
