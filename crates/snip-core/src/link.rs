use crate::shortcode::ShortCode;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Expiration policy for a shortened URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// The link never expires.
    Never,
    /// The link expires this long after it is created.
    AfterDuration(SignedDuration),
}

impl ExpirationPolicy {
    /// A validity window of whole days.
    pub fn days(days: i64) -> Self {
        Self::AfterDuration(SignedDuration::from_secs(days.saturating_mul(86_400)))
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self::days(30)
    }
}

/// A stored mapping from a short code to a long URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub code: ShortCode,
    pub long_url: String,
    pub created_at: Timestamp,
    /// When the link stops resolving, if ever.
    pub expires_at: Option<Timestamp>,
    pub click_count: u64,
}

impl ShortLink {
    /// A link is expired from its `expires_at` instant onwards.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Validity left at `now`, or `None` for links that never expire.
    ///
    /// Returns a zero duration once the link has expired.
    pub fn remaining_validity(&self, now: Timestamp) -> Option<SignedDuration> {
        self.expires_at
            .map(|expires_at| expires_at.duration_since(now).max(SignedDuration::ZERO))
    }
}

/// A link about to be inserted. The store starts its click count at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortLink {
    pub code: ShortCode,
    pub long_url: String,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl From<NewShortLink> for ShortLink {
    fn from(link: NewShortLink) -> Self {
        Self {
            code: link.code,
            long_url: link.long_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            click_count: 0,
        }
    }
}
