//! Redis implementation of the distributed cache tier.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use mediaurl_storage::{CacheError, DistributedCache};
use redis::AsyncCommands;

use crate::config::RedisConfig;

/// Shared cache backed by a deadpool Redis pool.
///
/// Values are written with `SET key value EX ttl`; bulk writes go through a
/// single non-transactional pipeline.
#[derive(Clone)]
pub struct RedisDistributedCache {
    pool: Pool,
}

impl RedisDistributedCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a connection pool from configuration.
    ///
    /// Does not connect; use [`DistributedCache::ping`] to verify.
    pub fn from_config(config: &RedisConfig) -> Result<Self, CacheError> {
        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let timeout = Duration::from_millis(config.timeout_ms);
        let pool_config = redis_config
            .pool
            .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let pool = redis_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| CacheError::connection(format!("failed to create Redis pool: {e}")))?;

        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::connection(e.to_string()))
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl DistributedCache for RedisDistributedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::command(format!("GET {key}: {e}")))?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::command(format!("MGET ({} keys): {e}", keys.len())))?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(key, value, ttl_secs(ttl))
            .await
            .map_err(|e| CacheError::command(format!("SET {key}: {e}")))?;
        tracing::debug!(key = %key, ttl_secs = ttl_secs(ttl), "cache set (L2)");
        Ok(())
    }

    async fn pipeline_set(&self, entries: &[(String, String, Duration)]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for (key, value, ttl) in entries {
            pipe.set_ex(key, value, ttl_secs(*ttl)).ignore();
        }

        let mut conn = self.conn().await?;
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::command(format!("pipelined SET ({} keys): {e}", entries.len())))?;
        tracing::debug!(entries = entries.len(), "cache pipeline set (L2)");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::command(format!("PING: {e}")))?;
        Ok(())
    }
}
