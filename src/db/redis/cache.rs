use redis::AsyncCommands;
use redis::Client;

use crate::db::cache::{CacheKey, CacheRetention, KeyValueCache};
use crate::error::AppResult;

/// Creates a Redis client for caching
///
/// Connections are opened lazily, one multiplexed connection per call.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Cache handler for storing and retrieving raw payloads in Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
}

impl Cache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl KeyValueCache for Cache {
    /// Retrieves the raw value stored under `key`, if any
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    /// Writes `value` under `key` and waits for Redis to acknowledge it
    async fn set(&self, key: &CacheKey, value: &str, retention: CacheRetention) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        match retention {
            CacheRetention::Forever => {
                let _: () = conn.set(key.to_string(), value).await?;
            }
            CacheRetention::Expire(ttl) => {
                let _: () = conn.set_ex(key.to_string(), value, ttl.as_secs()).await?;
            }
        }
        tracing::debug!(key = %key, retention = ?retention, "Cached value");
        Ok(())
    }
}
