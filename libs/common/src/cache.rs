//! Redis cache module for the check-in service
//!
//! This module provides functionality for connecting to Redis, writing
//! expiring hashes and running server-side scripts atomically.

use redis::{Client, Script, aio::MultiplexedConnection};
use tracing::info;

use crate::error::{CacheError, CacheResult};

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `REDIS_MAX_CONNECTIONS`: Maximum number of connections (default: 10)
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let max_connections = std::env::var("REDIS_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(CacheError::Configuration(format!(
                "REDIS_URL must use the redis:// or rediss:// scheme, got {}",
                url
            )));
        }

        Ok(RedisConfig {
            url,
            max_connections,
        })
    }
}

/// Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Initialize a new Redis connection pool
    pub async fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    /// Get a connection from the pool
    async fn get_connection(&self) -> CacheResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Connection)
    }

    /// Write all `fields` of a hash and set its TTL in one transaction
    pub async fn hset_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl_seconds: u64,
    ) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(key, fields)
            .ignore()
            .expire(key, ttl_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;

        Ok(())
    }

    /// Run a Lua script against one key; Redis executes it atomically
    pub async fn run_script(&self, script: &Script, key: &str, args: &[i64]) -> CacheResult<i64> {
        let mut conn = self.get_connection().await?;

        let mut invocation = script.key(key);
        for arg in args {
            invocation.arg(*arg);
        }
        invocation
            .invoke_async(&mut conn)
            .await
            .map_err(CacheError::Command)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn local_config() -> RedisConfig {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
            max_connections: 10,
        }
    }

    #[test]
    #[serial]
    fn test_redis_config_rejects_foreign_scheme() {
        unsafe {
            std::env::set_var("REDIS_URL", "http://localhost:6379");
        }

        let result = RedisConfig::from_env();
        assert!(matches!(result, Err(CacheError::Configuration(_))));

        unsafe {
            std::env::remove_var("REDIS_URL");
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_redis_connection() -> CacheResult<()> {
        let pool = RedisPool::new(&local_config()).await?;
        assert!(pool.health_check().await?);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_hash_write_and_script() -> CacheResult<()> {
        let pool = RedisPool::new(&local_config()).await?;
        let key = "test_hash_key";

        pool.hset_with_ttl(key, &[("counter", "1".to_string())], 5)
            .await?;

        let script = Script::new("return redis.call('HINCRBY', KEYS[1], 'counter', ARGV[1])");
        assert_eq!(pool.run_script(&script, key, &[41]).await?, 42);

        Ok(())
    }
}
