use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// An expiring cache of `code -> long URL` pairs.
///
/// Implementations can use Redis, in-memory caches, or other backends. They
/// must be safe to share between concurrent requests.
#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Get the long URL cached for a code.
    ///
    /// Returns `Ok(None)` if the key is not in the cache or its TTL elapsed.
    async fn get(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Store the long URL for a code.
    ///
    /// With `ttl: None` the entry has no expiry of its own and lives until it
    /// is evicted or removed.
    async fn set_with_ttl(
        &self,
        code: &ShortCode,
        long_url: &str,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Remove the entry for a code.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;
}
