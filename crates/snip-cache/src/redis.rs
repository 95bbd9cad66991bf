use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use snip_core::cache::Result;
use snip_core::{CacheError, LinkCache, ShortCode};
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const DEFAULT_KEY_PREFIX: &str = "snip:url:";

/// A Redis-based implementation of [`LinkCache`].
///
/// Long URLs are stored as plain strings under a configurable key prefix.
/// Entries with a TTL are written with `PSETEX` so Redis expires them at
/// millisecond precision. Clones share one multiplexed connection that
/// reconnects on failure.
#[derive(Clone)]
pub struct RedisLinkCache {
    conn: ConnectionManager,
    key_prefix: String,
}

fn map_redis_error(context: &str, err: redis::RedisError) -> CacheError {
    let timed_out = err.to_string().to_ascii_lowercase().contains("timed out");
    let message = format!("{context}: {err}");

    if timed_out {
        CacheError::Timeout(message)
    } else if err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisLinkCache {
    /// Creates a new Redis link cache using the default key prefix.
    pub fn new(conn: ConnectionManager) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a cache whose keys are `key_prefix` followed by the code.
    pub fn with_prefix(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a connection manager for `redis_url` and wraps it.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            CacheError::Initialization(format!("invalid redis url '{redis_url}': {e}"))
        })?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::with_prefix(conn, key_prefix))
    }

    fn key_for(&self, code: &ShortCode) -> String {
        let mut key = String::with_capacity(self.key_prefix.len() + code.as_str().len());
        key.push_str(&self.key_prefix);
        key.push_str(code.as_str());
        key
    }
}

impl std::fmt::Debug for RedisLinkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLinkCache")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let long_url: Option<String> = conn
            .get(self.key_for(code))
            .await
            .inspect_err(|e| warn!(code = %code, error = %e, "redis GET failed"))
            .map_err(|e| map_redis_error("redis GET", e))?;

        match &long_url {
            Some(_) => debug!(code = %code, "redis cache hit"),
            None => trace!(code = %code, "redis cache miss"),
        }
        Ok(long_url)
    }

    async fn set_with_ttl(
        &self,
        code: &ShortCode,
        long_url: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = self.key_for(code);
        let mut conn = self.conn.clone();

        let written = match ttl.map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)) {
            // PSETEX rejects a zero TTL, and an elapsed TTL means the entry
            // must not be visible at all.
            Some(0) => conn.del::<_, ()>(&key).await,
            Some(millis) => conn.pset_ex::<_, _, ()>(&key, long_url, millis).await,
            None => conn.set::<_, _, ()>(&key, long_url).await,
        };

        written
            .inspect_err(|e| warn!(code = %code, error = %e, "redis write failed"))
            .map_err(|e| map_redis_error("redis PSETEX/SET", e))?;
        debug!(code = %code, ?ttl, "stored long URL in redis");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key_for(code))
            .await
            .inspect_err(|e| warn!(code = %code, error = %e, "redis DEL failed"))
            .map_err(|e| map_redis_error("redis DEL", e))?;
        trace!(code = %code, "removed redis cache entry");
        Ok(())
    }
}
