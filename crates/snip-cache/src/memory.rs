use async_trait::async_trait;
use dashmap::DashMap;
use jiff::{SignedDuration, Timestamp};
use snip_core::cache::Result;
use snip_core::{CacheError, Clock, LinkCache, ShortCode, SystemClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Every this many writes, entries that expired without being read again
/// are swept out.
pub const SWEEP_EVERY: usize = 128;

#[derive(Debug, Clone)]
struct Entry {
    long_url: String,
    expires_at: Option<Timestamp>,
}

impl Entry {
    fn is_live_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// An unbounded in-process cache whose TTLs are measured on a [`Clock`].
///
/// Sharing a clock with the services keeps cache expiry and link expiry on
/// the same timeline, which is what makes deterministic expiry tests
/// possible. Expired entries are dropped when read, and swept every
/// [`SWEEP_EVERY`] writes so codes that are never read again do not pile up.
#[derive(Clone)]
pub struct MemoryLinkCache {
    entries: Arc<DashMap<String, Entry>>,
    writes: Arc<AtomicUsize>,
    clock: Arc<dyn Clock>,
}

impl MemoryLinkCache {
    /// Creates a cache driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            writes: Arc::new(AtomicUsize::new(0)),
            clock,
        }
    }

    /// Drops every entry that has expired, read or not.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live_at(now));
        trace!(
            removed = before.saturating_sub(self.entries.len()),
            "Swept expired memory cache entries"
        );
    }

    /// Number of entries held, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryLinkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLinkCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LinkCache for MemoryLinkCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<String>> {
        let key = code.as_str();

        let Some(entry) = self.entries.get(key).map(|e| e.value().clone()) else {
            trace!(code = %code, "Cache miss in memory cache");
            return Ok(None);
        };

        if !entry.is_live_at(self.clock.now()) {
            self.entries.remove(key);
            trace!(code = %code, "Memory cache entry expired");
            return Ok(None);
        }

        debug!(code = %code, "Cache hit in memory cache");
        Ok(Some(entry.long_url))
    }

    async fn set_with_ttl(
        &self,
        code: &ShortCode,
        long_url: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let expires_at = match ttl {
            Some(ttl) => {
                let ttl = SignedDuration::try_from(ttl)
                    .map_err(|e| CacheError::InvalidData(format!("ttl out of range: {e}")))?;
                let expires_at = self
                    .clock
                    .now()
                    .checked_add(ttl)
                    .map_err(|e| CacheError::InvalidData(format!("ttl out of range: {e}")))?;
                Some(expires_at)
            }
            None => None,
        };

        self.entries.insert(
            code.as_str().to_owned(),
            Entry {
                long_url: long_url.to_owned(),
                expires_at,
            },
        );
        debug!(code = %code, ?ttl, "Cached long URL in memory cache");

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            self.purge_expired();
        }
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        self.entries.remove(code.as_str());
        trace!(code = %code, "Removed entry from memory cache (if present)");
        Ok(())
    }
}
