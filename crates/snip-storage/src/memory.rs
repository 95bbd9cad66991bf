use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use snip_core::store::Result;
use snip_core::{LinkStore, NewShortLink, ShortCode, ShortLink, StorageError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// A stored row, keyed by its short code.
#[derive(Debug, Clone)]
struct Row {
    long_url: String,
    created_at: Timestamp,
    expires_at: Option<Timestamp>,
    click_count: u64,
}

impl Row {
    fn to_link(&self, code: &str) -> ShortLink {
        ShortLink {
            code: ShortCode::new_unchecked(code),
            long_url: self.long_url.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            click_count: self.click_count,
        }
    }
}

/// In-memory implementation of [`LinkStore`] using DashMap.
///
/// Rows are never removed, so a code stays taken after its link expires.
/// Each row gets an insertion sequence number, playing the part of an
/// auto-increment id. The long URL index keeps the code with the lowest
/// sequence for a URL, mirroring an `ORDER BY id LIMIT 1` lookup on a table
/// that allows duplicate URLs, however concurrent inserts interleave.
#[derive(Debug, Default)]
pub struct InMemoryLinkStore {
    rows: DashMap<String, Row>,
    by_long_url: DashMap<String, (u64, String)>,
    next_seq: AtomicU64,
}

impl InMemoryLinkStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: DashMap::with_capacity(capacity),
            by_long_url: DashMap::with_capacity(capacity),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Points `long_url` at `code` unless an earlier row already holds it.
    fn index_long_url(&self, long_url: String, seq: u64, code: String) {
        self.by_long_url
            .entry(long_url)
            .and_modify(|held| {
                if seq < held.0 {
                    *held = (seq, code.clone());
                }
            })
            .or_insert((seq, code));
    }

    /// Number of stored links, expired ones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortLink>> {
        let Some(code) = self.by_long_url.get(long_url).map(|held| held.1.clone()) else {
            return Ok(None);
        };

        Ok(self.rows.get(&code).map(|row| row.to_link(&code)))
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        Ok(self
            .rows
            .get(code.as_str())
            .map(|row| row.to_link(code.as_str())))
    }

    async fn insert(&self, link: NewShortLink) -> Result<()> {
        let key = link.code.as_str().to_owned();

        let seq = match self.rows.entry(key.clone()) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateCode(key)),
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                vacant.insert(Row {
                    long_url: link.long_url.clone(),
                    created_at: link.created_at,
                    expires_at: link.expires_at,
                    click_count: 0,
                });
                seq
            }
        };

        self.index_long_url(link.long_url, seq, key);
        trace!(code = %link.code, "inserted link");
        Ok(())
    }

    async fn get_click_count(&self, code: &ShortCode) -> Result<Option<u64>> {
        Ok(self.rows.get(code.as_str()).map(|row| row.click_count))
    }

    async fn set_click_count(&self, code: &ShortCode, count: u64) -> Result<()> {
        let mut row = self
            .rows
            .get_mut(code.as_str())
            .ok_or_else(|| StorageError::NotFound(code.to_string()))?;
        row.click_count = count;
        Ok(())
    }
}
