use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::store::Result;
use snip_core::{LinkStore, NewShortLink, ShortCode, ShortLink, StorageError};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};
use std::time::Duration;
use tracing::{debug, trace};

/// DDL for the `short_links` table.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_links.sql");

/// MySQL implementation of the [`LinkStore`] contract.
///
/// Timestamps are stored as BIGINT milliseconds since the Unix epoch. Rows are
/// never deleted, and the unique key on `code` therefore keeps every code ever
/// issued out of circulation. `long_url` carries a plain index, not a unique
/// one: the dedup lookup and the insert are separate statements.
#[derive(Debug, Clone)]
pub struct MySqlLinkStore {
    pool: MySqlPool,
}

impl MySqlLinkStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_links` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("ensured short_links schema");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn row_to_link(row: &MySqlRow) -> Result<ShortLink> {
    let code: String = row.try_get("code").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let click_count: u64 = row.try_get("click_count").map_err(map_sqlx_error)?;

    Ok(ShortLink {
        code: ShortCode::new_unchecked(code),
        long_url,
        created_at: parse_timestamp("created_at", created_at)?,
        expires_at: expires_at
            .map(|millis| parse_timestamp("expires_at", millis))
            .transpose()?,
        click_count,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl LinkStore for MySqlLinkStore {
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortLink>> {
        let row = sqlx::query(
            r#"
            SELECT code, long_url, created_at, expires_at, click_count
            FROM short_links
            WHERE long_url = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(long_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        let row = sqlx::query(
            r#"
            SELECT code, long_url, created_at, expires_at, click_count
            FROM short_links
            WHERE code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn insert(&self, link: NewShortLink) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_links (code, long_url, created_at, expires_at, click_count)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(link.code.as_str())
        .bind(&link.long_url)
        .bind(link.created_at.as_millisecond())
        .bind(link.expires_at.map(|ts| ts.as_millisecond()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                trace!(code = %link.code, "inserted link");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::DuplicateCode(link.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get_click_count(&self, code: &ShortCode) -> Result<Option<u64>> {
        let row = sqlx::query("SELECT click_count FROM short_links WHERE code = ? LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| row.try_get::<u64, _>("click_count"))
            .transpose()
            .map_err(map_sqlx_error)
    }

    async fn set_click_count(&self, code: &ShortCode, count: u64) -> Result<()> {
        // Affected-row counts are unreliable for no-op updates in MySQL, so
        // existence is checked separately.
        if self.get_click_count(code).await?.is_none() {
            return Err(StorageError::NotFound(code.to_string()));
        }

        sqlx::query("UPDATE short_links SET click_count = ? WHERE code = ?")
            .bind(count)
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn increment_click_count(&self, code: &ShortCode) -> Result<u64> {
        // Plain read then write inside one transaction: no row lock is taken,
        // so concurrent increments are last-write-wins.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let current: Option<u64> =
            sqlx::query_scalar("SELECT click_count FROM short_links WHERE code = ? LIMIT 1")
                .bind(code.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let Some(current) = current else {
            return Err(StorageError::NotFound(code.to_string()));
        };
        let next = current.saturating_add(1);

        sqlx::query("UPDATE short_links SET click_count = ? WHERE code = ?")
            .bind(next)
            .bind(code.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(next)
    }
}
