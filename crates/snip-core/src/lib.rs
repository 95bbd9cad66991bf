//! Core types and traits for the snip URL shortener.
//!
//! This crate holds the domain model shared by the services and the
//! adapter traits implemented by the storage and cache crates.

pub mod cache;
pub mod clock;
pub mod error;
pub mod link;
pub mod shortcode;
pub mod store;

pub use cache::LinkCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, CoreError, StorageError};
pub use link::{ExpirationPolicy, NewShortLink, ShortLink};
pub use shortcode::ShortCode;
pub use store::LinkStore;
