use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use snip_core::cache::Result;
use snip_core::{LinkCache, ShortCode};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone)]
struct CachedUrl {
    long_url: String,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedUrl> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedUrl,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedUrl,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// An in-memory cache implementation using Moka.
///
/// Entries carry their own TTL, so a link cached with one day of validity
/// left disappears from the cache when the link expires. Capacity is bounded
/// and excess entries are evicted.
#[derive(Debug, Clone)]
pub struct MokaLinkCache {
    cache: Cache<String, CachedUrl>,
}

impl MokaLinkCache {
    /// Creates a new Moka link cache with default settings.
    ///
    /// The cache will have a default maximum capacity of 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Creates a new Moka link cache with a custom maximum capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        MokaCacheConfig::builder()
            .max_capacity(max_capacity)
            .build()
            .into()
    }

    /// Returns a builder for creating a custom cache configuration.
    pub fn builder() -> MokaCacheConfigBuilder {
        MokaCacheConfig::builder()
    }

    /// Number of live entries, after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Fetching long URL from Moka cache");

        match self.cache.get(code.as_str()).await {
            Some(cached) => {
                debug!(code = %code, "Cache hit in Moka");
                Ok(Some(cached.long_url))
            }
            None => {
                trace!(code = %code, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_with_ttl(
        &self,
        code: &ShortCode,
        long_url: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        trace!(code = %code, ?ttl, "Storing long URL in Moka cache");

        let value = CachedUrl {
            long_url: long_url.to_owned(),
            ttl,
        };
        self.cache.insert(code.as_str().to_owned(), value).await;
        debug!(code = %code, "Cached long URL in Moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Removing long URL from Moka cache");

        self.cache.invalidate(code.as_str()).await;
        debug!(code = %code, "Removed entry from Moka cache (if present)");
        Ok(())
    }
}

/// Configuration for creating a [`MokaLinkCache`] with custom settings.
#[derive(Debug, TypedBuilder, Default)]
pub struct MokaCacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default, setter(strip_option))]
    max_capacity: Option<u64>,
    /// Expire entries that were not read for this long, on top of their TTL.
    #[builder(default, setter(strip_option))]
    tti: Option<Duration>,
}

impl From<MokaCacheConfig> for MokaLinkCache {
    fn from(config: MokaCacheConfig) -> Self {
        let mut builder = Cache::builder().expire_after(PerEntryTtl);

        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        MokaLinkCache {
            cache: builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn cache_get_and_set() {
        let cache = MokaLinkCache::new();
        let c = code("abc123");

        assert!(cache.get(&c).await.unwrap().is_none());

        cache
            .set_with_ttl(&c, "https://example.com/", None)
            .await
            .unwrap();

        assert_eq!(
            cache.get(&c).await.unwrap().as_deref(),
            Some("https://example.com/")
        );
    }

    #[tokio::test]
    async fn cache_del_removes_entry() {
        let cache = MokaLinkCache::new();
        let c = code("abc123");

        cache
            .set_with_ttl(&c, "https://example.com/", None)
            .await
            .unwrap();
        cache.del(&c).await.unwrap();

        assert!(cache.get(&c).await.unwrap().is_none());

        // Deleting again is still fine
        cache.del(&c).await.unwrap();
    }

    #[tokio::test]
    async fn entry_expires_after_its_own_ttl() {
        let cache = MokaLinkCache::new();
        let short = code("short1");
        let long = code("long01");

        cache
            .set_with_ttl(&short, "https://short.example/", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        cache
            .set_with_ttl(&long, "https://long.example/", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(cache.get(&short).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get(&short).await.unwrap().is_none());
        assert!(cache.get(&long).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn overwrite_resets_ttl() {
        let cache = MokaLinkCache::new();
        let c = code("abc123");

        cache
            .set_with_ttl(&c, "https://example.com/", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        cache
            .set_with_ttl(&c, "https://example.com/", None)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get(&c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cache_builder_pattern() {
        let cache: MokaLinkCache = MokaLinkCache::builder()
            .max_capacity(1000)
            .tti(Duration::from_secs(30))
            .build()
            .into();

        let c = code("abc123");
        cache
            .set_with_ttl(&c, "https://example.com/", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        assert!(cache.get(&c).await.unwrap().is_some());
        assert_eq!(cache.entry_count().await, 1);
    }
}
