use crate::error::StorageError;
use crate::link::{NewShortLink, ShortLink};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The durable link table.
///
/// Implementations must enforce uniqueness of `code` across every record they
/// have ever stored and must be safe to share between concurrent requests.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Finds the link recorded for an exact (normalized) long URL.
    ///
    /// When more than one record exists for the URL, the earliest inserted
    /// one wins, so every lookup agrees once the inserts have completed.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortLink>>;

    /// Finds a link by its short code, expired or not.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>>;

    /// Inserts a new link with a click count of zero.
    ///
    /// Returns `Err(DuplicateCode)` if the code has ever been used.
    async fn insert(&self, link: NewShortLink) -> Result<()>;

    /// Returns the click count for a code, or `None` if the code is unknown.
    async fn get_click_count(&self, code: &ShortCode) -> Result<Option<u64>>;

    /// Overwrites the click count for a code.
    ///
    /// Returns `Err(NotFound)` if the code is unknown.
    async fn set_click_count(&self, code: &ShortCode, count: u64) -> Result<()>;

    /// Bumps the click count by one and returns the new value.
    ///
    /// This is a read followed by a write with no compare-and-swap, so two
    /// concurrent increments of the same code can collapse into one.
    async fn increment_click_count(&self, code: &ShortCode) -> Result<u64> {
        let current = self
            .get_click_count(code)
            .await?
            .ok_or_else(|| StorageError::NotFound(code.to_string()))?;
        let next = current.saturating_add(1);
        self.set_click_count(code, next).await?;
        Ok(next)
    }
}
