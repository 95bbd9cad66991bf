//! Link shortening, resolution and stats on top of a [`LinkStore`] and a
//! [`LinkCache`].
//!
//! The three services can be used on their own. [`SnipService`] bundles them
//! behind the object-safe [`LinkService`] trait for transports that pick
//! their backends at runtime.

pub mod error;
pub mod resolve;
pub mod shorten;
pub mod stats;

pub use error::LinkError;
pub use resolve::{Resolution, ResolveService};
pub use shorten::{
    normalize_url, ShortenRequest, ShortenService, ShortenSettings, ShortenedLink,
    DEFAULT_MAX_ATTEMPTS, MAX_URL_LENGTH,
};
pub use stats::{LinkStats, StatsService};

use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::{Clock, LinkCache, LinkStore, ShortCode, ShortLink};
use snip_generator::Generator;
use std::sync::Arc;
use std::time::Duration;

/// TTL for caching `link` at `now`, so the entry lapses exactly at the
/// stored `expires_at`.
///
/// Returns `None` once the link has expired and must not be cached, and
/// `Some(None)` for links that never expire.
pub(crate) fn cache_ttl(link: &ShortLink, now: Timestamp) -> Option<Option<Duration>> {
    if link.is_expired_at(now) {
        return None;
    }

    Some(
        link.remaining_validity(now)
            .map(|remaining| Duration::try_from(remaining).unwrap_or_default()),
    )
}

#[async_trait]
pub trait LinkService: Send + Sync + 'static {
    /// Returns the link for `request.long_url`, minting one if needed.
    async fn shorten(&self, request: ShortenRequest) -> error::Result<ShortenedLink>;

    /// Looks up the long URL for a code and counts the click.
    async fn resolve(&self, code: &ShortCode) -> error::Result<Resolution>;

    /// Reports a link without counting a click.
    async fn stats(&self, code: &ShortCode) -> error::Result<LinkStats>;
}

/// All three services wired to the same store, cache and clock.
pub struct SnipService<S: ?Sized, C: ?Sized, G> {
    shortener: ShortenService<S, C, G>,
    resolver: ResolveService<S, C>,
    stats: StatsService<S>,
}

impl<S, C, G> SnipService<S, C, G>
where
    S: LinkStore + ?Sized,
    C: LinkCache + ?Sized,
    G: Generator,
{
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        generator: G,
        clock: Arc<dyn Clock>,
        settings: ShortenSettings,
    ) -> Self {
        Self {
            shortener: ShortenService::new(
                Arc::clone(&store),
                Arc::clone(&cache),
                generator,
                Arc::clone(&clock),
            )
            .with_settings(settings),
            resolver: ResolveService::new(Arc::clone(&store), cache, clock),
            stats: StatsService::new(store),
        }
    }
}

#[async_trait]
impl<S, C, G> LinkService for SnipService<S, C, G>
where
    S: LinkStore + ?Sized,
    C: LinkCache + ?Sized,
    G: Generator,
{
    async fn shorten(&self, request: ShortenRequest) -> error::Result<ShortenedLink> {
        self.shortener.shorten(request).await
    }

    async fn resolve(&self, code: &ShortCode) -> error::Result<Resolution> {
        self.resolver.resolve(code).await
    }

    async fn stats(&self, code: &ShortCode) -> error::Result<LinkStats> {
        self.stats.stats(code).await
    }
}
