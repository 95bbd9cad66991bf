//! [`LinkCache`] implementations.
//!
//! - [`MemoryLinkCache`]: a map whose expiry follows an injected [`Clock`].
//! - [`MokaLinkCache`]: a bounded moka cache with per-entry TTLs.
//! - [`RedisLinkCache`]: Redis strings written with `PSETEX`.
//!
//! [`Clock`]: snip_core::Clock

pub mod memory;
pub mod moka;
pub mod redis;

pub use self::moka::{MokaCacheConfig, MokaLinkCache};
pub use self::redis::RedisLinkCache;
pub use memory::MemoryLinkCache;
pub use snip_core::{CacheError, LinkCache};
