use snip_core::{CacheError, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkError>;

/// Everything a shorten, resolve or stats call can fail with.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    /// The long URL or the requested validity is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Every generated candidate collided with an existing code.
    #[error("no free short code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    /// The code was never issued.
    #[error("short code not found: {0}")]
    NotFound(String),
    /// The code was issued but its validity window has passed.
    #[error("short code expired: {0}")]
    Expired(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
    #[error("cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),
}
