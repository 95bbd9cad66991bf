use crate::cache_ttl;
use crate::error::{LinkError, Result};
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use snip_core::{
    Clock, ExpirationPolicy, LinkCache, LinkStore, NewShortLink, ShortCode, ShortLink,
    StorageError,
};
use snip_generator::Generator;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;
use url::Url;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Longest long URL accepted, matching the `long_url` column width.
pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenSettings {
    /// How many generated codes to try before giving up on a request.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl Default for ShortenSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone)]
pub struct ShortenRequest {
    /// The URL to shorten. It is normalized before it is stored.
    pub long_url: String,
    pub expiration: ExpirationPolicy,
}

impl ShortenRequest {
    pub fn new(long_url: impl Into<String>, expiration: ExpirationPolicy) -> Self {
        Self {
            long_url: long_url.into(),
            expiration,
        }
    }
}

/// The outcome of a shorten call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortenedLink {
    pub code: ShortCode,
    pub long_url: String,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    /// `false` when an existing link for the same URL was returned.
    pub created: bool,
}

impl ShortenedLink {
    fn from_link(link: ShortLink, created: bool) -> Self {
        Self {
            code: link.code,
            long_url: link.long_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            created,
        }
    }
}

/// Mints short codes for long URLs.
///
/// Handles:
/// - URL validation and normalization
/// - Dedup: a URL that already has a link gets that link back untouched
/// - Collision retry: the generator only proposes codes, the store's unique
///   constraint decides, and a duplicate triggers a fresh draw
/// - Seeding the cache with a TTL that ends at the link's expiry
///
/// The dedup lookup and the insert are two separate store calls. Two
/// concurrent first submissions of the same URL can therefore both miss the
/// lookup and receive different codes.
pub struct ShortenService<S: ?Sized, C: ?Sized, G> {
    store: Arc<S>,
    cache: Arc<C>,
    generator: G,
    clock: Arc<dyn Clock>,
    settings: ShortenSettings,
}

impl<S, C, G> ShortenService<S, C, G>
where
    S: LinkStore + ?Sized,
    C: LinkCache + ?Sized,
    G: Generator,
{
    pub fn new(store: Arc<S>, cache: Arc<C>, generator: G, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache,
            generator,
            clock,
            settings: ShortenSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ShortenSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn shorten(&self, request: ShortenRequest) -> Result<ShortenedLink> {
        let long_url = normalize_url(&request.long_url)?;
        let validity = validity_window(request.expiration)?;

        if let Some(existing) = self.store.find_by_long_url(&long_url).await? {
            debug!(code = %existing.code, "long URL already shortened");
            return Ok(ShortenedLink::from_link(existing, false));
        }

        let created_at = self.clock.now();
        let expires_at = validity
            .map(|validity| created_at.checked_add(validity))
            .transpose()
            .map_err(|e| LinkError::InvalidInput(format!("validity out of range: {e}")))?;

        for attempt in 1..=self.settings.max_attempts {
            let code = self.generator.generate();
            trace!(code = %code, attempt, "trying generated code");

            let link = NewShortLink {
                code: code.clone(),
                long_url: long_url.clone(),
                created_at,
                expires_at,
            };

            match self.store.insert(link.clone()).await {
                Ok(()) => {
                    let link = ShortLink::from(link);
                    self.seed_cache(&link).await;
                    debug!(code = %code, attempt, "shortened long URL");
                    return Ok(ShortenedLink::from_link(link, true));
                }
                Err(StorageError::DuplicateCode(_)) => {
                    warn!(code = %code, attempt, "generated code collided, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LinkError::CodeSpaceExhausted {
            attempts: self.settings.max_attempts,
        })
    }

    /// The link is durable at this point, so a failed cache write only
    /// costs a store lookup on the first resolve.
    ///
    /// The TTL runs to the stored `expires_at`, measured after the insert
    /// returned.
    async fn seed_cache(&self, link: &ShortLink) {
        let Some(ttl) = cache_ttl(link, self.clock.now()) else {
            debug!(code = %link.code, "link expired before it could be cached");
            return;
        };

        if let Err(e) = self.cache.set_with_ttl(&link.code, &link.long_url, ttl).await {
            warn!(code = %link.code, error = %e, "failed to seed cache after insert");
        }
    }
}

fn validity_window(expiration: ExpirationPolicy) -> Result<Option<SignedDuration>> {
    match expiration {
        ExpirationPolicy::Never => Ok(None),
        ExpirationPolicy::AfterDuration(validity) if validity.is_positive() => Ok(Some(validity)),
        ExpirationPolicy::AfterDuration(validity) => Err(LinkError::InvalidInput(format!(
            "validity must be positive, got {validity}"
        ))),
    }
}

/// Parses `raw` as an absolute http(s) URL and returns its normalized form.
///
/// Normalization is whatever the WHATWG URL serializer produces: the scheme
/// and host are lower-cased and an empty path becomes `/`. Dedup compares
/// normalized strings.
pub fn normalize_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LinkError::InvalidInput("URL cannot be empty".to_string()));
    }

    let url = Url::parse(raw)
        .map_err(|e| LinkError::InvalidInput(format!("malformed URL '{raw}': {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(LinkError::InvalidInput(format!(
            "URL scheme must be http or https: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(LinkError::InvalidInput(format!("URL must have a host: {raw}")));
    }

    let normalized = String::from(url);
    if normalized.len() > MAX_URL_LENGTH {
        return Err(LinkError::InvalidInput(format!(
            "URL must be at most {MAX_URL_LENGTH} characters, got {}",
            normalized.len()
        )));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, LaggingStore, ScriptedGenerator, UnavailableStore};
    use snip_cache::MemoryLinkCache;
    use snip_core::ManualClock;
    use snip_generator::RandomGenerator;
    use std::collections::HashSet;

    #[test]
    fn normalize_accepts_http_and_https() {
        assert_eq!(
            normalize_url("https://example.com").unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url("  HTTP://Example.COM/a?b=c  ").unwrap(),
            "http://example.com/a?b=c"
        );
    }

    #[test]
    fn normalize_rejects_malformed_urls() {
        for raw in [
            "",
            "   ",
            "not-a-valid-url",
            "/relative/path",
            "ftp://example.com/file",
            "mailto:someone@example.com",
            "https://",
        ] {
            let err = normalize_url(raw).unwrap_err();
            assert!(matches!(err, LinkError::InvalidInput(_)), "{raw:?} -> {err:?}");
        }
    }

    #[test]
    fn normalize_rejects_overlong_urls() {
        let raw = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(
            normalize_url(&raw).unwrap_err(),
            LinkError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn shorten_mints_code_and_expiry() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(RandomGenerator::default());

        let link = service
            .shorten(ShortenRequest::new(
                "https://example.com/a",
                ExpirationPolicy::days(1),
            ))
            .await
            .unwrap();

        assert!(link.created);
        assert_eq!(link.code.as_str().len(), 6);
        assert_eq!(link.long_url, "https://example.com/a");
        assert_eq!(link.created_at, fixture.start);
        assert_eq!(
            link.expires_at,
            Some(fixture.start + SignedDuration::from_hours(24))
        );

        let stored = fixture.store.find_by_code(&link.code).await.unwrap().unwrap();
        assert_eq!(stored.click_count, 0);
        assert_eq!(stored.expires_at, link.expires_at);
    }

    #[tokio::test]
    async fn shorten_seeds_cache_for_the_validity_window() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(RandomGenerator::default());

        let link = service
            .shorten(ShortenRequest::new(
                "https://example.com/a",
                ExpirationPolicy::days(1),
            ))
            .await
            .unwrap();

        assert_eq!(
            fixture.cache.get(&link.code).await.unwrap().as_deref(),
            Some("https://example.com/a")
        );

        fixture.clock.advance(SignedDuration::from_hours(24));
        assert!(fixture.cache.get(&link.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_seed_ends_at_stored_expiry_after_slow_insert() {
        let fixture = Fixture::new();
        let service = ShortenService::new(
            Arc::new(LaggingStore::new(&fixture, SignedDuration::from_secs(2))),
            Arc::clone(&fixture.cache),
            RandomGenerator::default(),
            Arc::new(fixture.clock.clone()),
        );

        let link = service
            .shorten(ShortenRequest::new(
                "https://example.com/a",
                ExpirationPolicy::days(1),
            ))
            .await
            .unwrap();
        let expires_at = link.expires_at.unwrap();
        assert_eq!(expires_at, fixture.start + SignedDuration::from_hours(24));
        assert_eq!(fixture.clock.now(), fixture.start + SignedDuration::from_secs(2));

        fixture.clock.set(expires_at - SignedDuration::from_millis(1));
        assert!(fixture.cache.get(&link.code).await.unwrap().is_some());
        fixture.clock.set(expires_at);
        assert!(fixture.cache.get(&link.code).await.unwrap().is_none());

        fixture.clock.set(expires_at + SignedDuration::from_secs(1));
        let err = fixture.resolve_service().resolve(&link.code).await.unwrap_err();
        assert!(matches!(err, LinkError::Expired(_)));
        assert_eq!(
            fixture.store.get_click_count(&link.code).await.unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn link_expiring_during_insert_is_not_cached() {
        let fixture = Fixture::new();
        let service = ShortenService::new(
            Arc::new(LaggingStore::new(&fixture, SignedDuration::from_hours(48))),
            Arc::clone(&fixture.cache),
            RandomGenerator::default(),
            Arc::new(fixture.clock.clone()),
        );

        let link = service
            .shorten(ShortenRequest::new(
                "https://example.com/a",
                ExpirationPolicy::days(1),
            ))
            .await
            .unwrap();

        assert!(link.created);
        assert!(fixture.cache.is_empty());
        assert!(fixture.store.find_by_code(&link.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn shorten_is_idempotent_for_the_same_url() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(RandomGenerator::default());

        let first = service
            .shorten(ShortenRequest::new("https://example.com", ExpirationPolicy::days(30)))
            .await
            .unwrap();

        fixture.clock.advance(SignedDuration::from_hours(1));
        fixture
            .store
            .set_click_count(&first.code, 7)
            .await
            .unwrap();

        // Same URL after normalization, different validity: nothing changes.
        let second = service
            .shorten(ShortenRequest::new("HTTPS://EXAMPLE.COM/", ExpirationPolicy::days(1)))
            .await
            .unwrap();

        assert!(!second.created);
        assert_eq!(second.code, first.code);
        assert_eq!(second.expires_at, first.expires_at);
        assert_eq!(fixture.store.len(), 1);
        assert_eq!(
            fixture.store.get_click_count(&first.code).await.unwrap(),
            Some(7)
        );
    }

    #[tokio::test]
    async fn shorten_returns_expired_link_unchanged() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(RandomGenerator::default());

        let first = service
            .shorten(ShortenRequest::new("https://example.com/", ExpirationPolicy::days(1)))
            .await
            .unwrap();
        fixture.clock.advance(SignedDuration::from_hours(48));

        let again = service
            .shorten(ShortenRequest::new("https://example.com/", ExpirationPolicy::days(1)))
            .await
            .unwrap();

        assert!(!again.created);
        assert_eq!(again.code, first.code);
        assert_eq!(again.expires_at, first.expires_at);
    }

    #[tokio::test]
    async fn shorten_never_expiring_link() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(RandomGenerator::default());

        let link = service
            .shorten(ShortenRequest::new("https://example.com/", ExpirationPolicy::Never))
            .await
            .unwrap();

        assert_eq!(link.expires_at, None);
        fixture.clock.advance(SignedDuration::from_hours(24 * 3650));
        assert!(fixture.cache.get(&link.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn shorten_rejects_invalid_input_without_touching_the_store() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(RandomGenerator::default());

        let err = service
            .shorten(ShortenRequest::new("not-a-valid-url", ExpirationPolicy::days(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidInput(_)));

        let err = service
            .shorten(ShortenRequest::new("https://example.com/", ExpirationPolicy::days(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidInput(_)));

        let err = service
            .shorten(ShortenRequest::new(
                "https://example.com/",
                ExpirationPolicy::AfterDuration(SignedDuration::from_secs(-5)),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidInput(_)));

        assert!(fixture.store.is_empty());
    }

    #[tokio::test]
    async fn shorten_retries_on_collision() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(ScriptedGenerator::new(["aaaaaa", "aaaaaa", "bbbbbb"]));

        let first = service
            .shorten(ShortenRequest::new("https://one.example/", ExpirationPolicy::days(1)))
            .await
            .unwrap();
        let second = service
            .shorten(ShortenRequest::new("https://two.example/", ExpirationPolicy::days(1)))
            .await
            .unwrap();

        assert_eq!(first.code.as_str(), "aaaaaa");
        assert_eq!(second.code.as_str(), "bbbbbb");
        assert_eq!(fixture.store.len(), 2);
    }

    #[tokio::test]
    async fn shorten_gives_up_after_max_attempts() {
        let fixture = Fixture::new();
        let generator = ScriptedGenerator::new(["zzzzzz"]);
        let service = fixture
            .shorten_service(generator.clone())
            .with_settings(ShortenSettings::builder().max_attempts(3).build());

        service
            .shorten(ShortenRequest::new("https://one.example/", ExpirationPolicy::days(1)))
            .await
            .unwrap();

        let err = service
            .shorten(ShortenRequest::new("https://two.example/", ExpirationPolicy::days(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, LinkError::CodeSpaceExhausted { attempts: 3 }));
        // One draw for the first request, three for the second.
        assert_eq!(generator.draws(), 4);
        assert!(fixture
            .store
            .find_by_long_url("https://two.example/")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn shorten_default_attempts_with_a_single_code_space() {
        let fixture = Fixture::new();
        let service = fixture.shorten_service(RandomGenerator::with_alphabet(1, "x").unwrap());

        service
            .shorten(ShortenRequest::new("https://one.example/", ExpirationPolicy::days(1)))
            .await
            .unwrap();
        let err = service
            .shorten(ShortenRequest::new("https://two.example/", ExpirationPolicy::days(1)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LinkError::CodeSpaceExhausted {
                attempts: DEFAULT_MAX_ATTEMPTS
            }
        ));
    }

    #[tokio::test]
    async fn distinct_urls_never_share_a_code_under_rapid_generation() {
        let fixture = Fixture::new();
        // 62^2 = 3844 codes for 1500 URLs forces plenty of collisions.
        let service = Arc::new(
            fixture
                .shorten_service(RandomGenerator::new(2).unwrap())
                .with_settings(ShortenSettings::builder().max_attempts(1_000).build()),
        );

        let mut handles = vec![];
        for i in 0..1_500 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .shorten(ShortenRequest::new(
                        format!("https://example.com/{i}"),
                        ExpirationPolicy::days(1),
                    ))
                    .await
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            let link = handle.await.unwrap().unwrap();
            assert!(codes.insert(link.code.clone()), "code reused: {}", link.code);
        }

        assert_eq!(codes.len(), 1_500);
        for code in &codes {
            let stored = fixture.store.find_by_code(code).await.unwrap().unwrap();
            assert_eq!(
                fixture.store.find_by_long_url(&stored.long_url).await.unwrap().unwrap().code,
                *code
            );
        }
    }

    #[tokio::test]
    async fn concurrent_first_submissions_may_race() {
        let fixture = Fixture::new();
        let service = Arc::new(fixture.shorten_service(RandomGenerator::default()));

        let mut handles = vec![];
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .shorten(ShortenRequest::new(
                        "https://example.com/race",
                        ExpirationPolicy::days(1),
                    ))
                    .await
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            codes.insert(handle.await.unwrap().unwrap().code);
        }

        // Lookup-then-insert is not atomic: one code is typical, several are
        // allowed. Later submissions settle on the earliest record.
        assert!(!codes.is_empty() && codes.len() <= 8);
        assert_eq!(fixture.store.len(), codes.len());

        let settled = service
            .shorten(ShortenRequest::new("https://example.com/race", ExpirationPolicy::days(1)))
            .await
            .unwrap();
        assert!(!settled.created);
        assert!(codes.contains(&settled.code));
    }

    #[tokio::test]
    async fn storage_failure_is_not_masked() {
        let clock = ManualClock::new(Timestamp::from_second(1_700_000_000).unwrap());
        let service = ShortenService::new(
            Arc::new(UnavailableStore),
            Arc::new(MemoryLinkCache::with_clock(Arc::new(clock.clone()))),
            RandomGenerator::default(),
            Arc::new(clock),
        );

        let err = service
            .shorten(ShortenRequest::new("https://example.com/", ExpirationPolicy::days(1)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LinkError::StorageUnavailable(StorageError::Unavailable(_))
        ));
    }
}
