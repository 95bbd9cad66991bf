use crate::cache_ttl;
use crate::error::{LinkError, Result};
use serde::Serialize;
use snip_core::{Clock, LinkCache, LinkStore, ShortCode, StorageError};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What a short code resolves to, with the click count after this access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub long_url: String,
    pub click_count: u64,
}

/// Resolves short codes through the cache, falling back to the store.
///
/// Every successful resolution bumps the link's click count in the store. A
/// cache miss that finds a live link repopulates the cache until that link's
/// `expires_at`, so a cache hit never serves an expired link.
pub struct ResolveService<S: ?Sized, C: ?Sized> {
    store: Arc<S>,
    cache: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<S, C> ResolveService<S, C>
where
    S: LinkStore + ?Sized,
    C: LinkCache + ?Sized,
{
    pub fn new(store: Arc<S>, cache: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache,
            clock,
        }
    }

    pub async fn resolve(&self, code: &ShortCode) -> Result<Resolution> {
        if let Some(long_url) = self.cache.get(code).await? {
            trace!(code = %code, "resolved from cache");
            let click_count = self.count_cached_click(code).await?;
            return Ok(Resolution {
                long_url,
                click_count,
            });
        }

        let link = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| LinkError::NotFound(code.to_string()))?;

        let now = self.clock.now();
        if link.is_expired_at(now) {
            debug!(code = %code, expires_at = ?link.expires_at, "short code expired");
            return Err(LinkError::Expired(code.to_string()));
        }

        let click_count = self.store.increment_click_count(code).await?;

        // The increment may take a while; measure the TTL after it.
        match cache_ttl(&link, self.clock.now()) {
            Some(ttl) => {
                if let Err(e) = self.cache.set_with_ttl(code, &link.long_url, ttl).await {
                    warn!(code = %code, error = %e, "failed to repopulate cache");
                }
            }
            None => debug!(code = %code, "link expired during resolve, not caching"),
        }

        debug!(code = %code, click_count, "resolved from store");
        Ok(Resolution {
            long_url: link.long_url,
            click_count,
        })
    }

    /// The cache can outlive the store row it was seeded from. That is only
    /// logged; the caller still gets redirected.
    async fn count_cached_click(&self, code: &ShortCode) -> Result<u64> {
        match self.store.increment_click_count(code).await {
            Ok(count) => Ok(count),
            Err(StorageError::NotFound(_)) => {
                warn!(code = %code, "cached short code has no stored record");
                Ok(1)
            }
            Err(e) => Err(e.into()),
        }
    }
}
