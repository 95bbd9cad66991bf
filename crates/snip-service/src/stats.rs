use crate::error::{LinkError, Result};
use jiff::Timestamp;
use serde::Serialize;
use snip_core::{LinkStore, ShortCode, ShortLink};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub code: ShortCode,
    pub long_url: String,
    pub click_count: u64,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl From<ShortLink> for LinkStats {
    fn from(link: ShortLink) -> Self {
        Self {
            code: link.code,
            long_url: link.long_url,
            click_count: link.click_count,
            created_at: link.created_at,
            expires_at: link.expires_at,
        }
    }
}

/// Read-only view of a link straight from the store. Expired links still
/// report their stats.
pub struct StatsService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: LinkStore + ?Sized> StatsService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn stats(&self, code: &ShortCode) -> Result<LinkStats> {
        trace!(code = %code, "fetching link stats");

        self.store
            .find_by_code(code)
            .await?
            .map(LinkStats::from)
            .ok_or_else(|| LinkError::NotFound(code.to_string()))
    }
}
