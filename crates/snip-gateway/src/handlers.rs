mod health;
mod links;

pub use health::health_handler;
pub use links::{create_link_handler, link_stats_handler, resolve_link_handler};
