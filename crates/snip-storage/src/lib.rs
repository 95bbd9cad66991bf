//! [`LinkStore`] implementations: an in-memory table and MySQL.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryLinkStore;
pub use mysql::MySqlLinkStore;
pub use snip_core::{LinkStore, StorageError};
