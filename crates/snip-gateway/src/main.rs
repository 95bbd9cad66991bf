mod app;
mod cli;
mod error;
mod handlers;
mod model;
mod state;

use crate::app::App;
use crate::cli::{CacheBackendArg, Cli, StorageBackendArg};
use crate::state::AppState;
use anyhow::{anyhow, Context};
use clap::Parser;
use snip_cache::{MemoryLinkCache, MokaLinkCache, RedisLinkCache};
use snip_core::{LinkCache, LinkStore, SystemClock};
use snip_generator::RandomGenerator;
use snip_service::{LinkService, ShortenSettings, SnipService};
use snip_storage::{InMemoryLinkStore, MySqlLinkStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

const MYSQL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const MYSQL_RETRY_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse();

    snip_telemetry::init(config.log_format.into(), snip_telemetry::DEFAULT_FILTER)
        .context("failed to initialize tracing")?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        code_length = config.code_length,
        "starting snip gateway"
    );

    let store = build_store(&config).await?;
    let cache = build_cache(&config).await?;
    let generator =
        RandomGenerator::new(config.code_length).context("invalid short code length")?;
    let settings = ShortenSettings::builder()
        .max_attempts(config.max_attempts)
        .build();

    let service: Arc<dyn LinkService> = Arc::new(SnipService::new(
        store,
        cache,
        generator,
        Arc::new(SystemClock),
        settings,
    ));
    let state = AppState::new(service, config.base_url, config.default_days_valid);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server failed")?;

    info!("gateway stopped");
    Ok(())
}

async fn build_store(config: &Cli) -> anyhow::Result<Arc<dyn LinkStore>> {
    match config.storage {
        StorageBackendArg::InMemory => Ok(Arc::new(InMemoryLinkStore::new())),
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or_else(|| anyhow!("mysql dsn is required when storage backend is mysql"))?;
            let store = connect_mysql(
                dsn,
                config.mysql_max_connections,
                config.mysql_connect_attempts,
            )
            .await?;
            store
                .migrate()
                .await
                .context("failed to create short_links table")?;
            Ok(Arc::new(store))
        }
    }
}

/// Opens the pool, retrying up to `attempts` times with a fixed delay.
async fn connect_mysql(
    dsn: &str,
    max_connections: u32,
    attempts: u32,
) -> anyhow::Result<MySqlLinkStore> {
    let mut attempt = 1;
    loop {
        match MySqlLinkStore::connect(dsn, max_connections, MYSQL_ACQUIRE_TIMEOUT).await {
            Ok(store) => {
                info!(attempt, "connected to MySQL");
                return Ok(store);
            }
            Err(e) if attempt < attempts => {
                warn!(attempt, attempts, error = %e, "MySQL not reachable, retrying");
                tokio::time::sleep(MYSQL_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to connect to MySQL after {attempts} attempts")
                })
            }
        }
    }
}

async fn build_cache(config: &Cli) -> anyhow::Result<Arc<dyn LinkCache>> {
    match config.cache {
        CacheBackendArg::Memory => Ok(Arc::new(MemoryLinkCache::new())),
        CacheBackendArg::Moka => Ok(Arc::new(MokaLinkCache::with_capacity(
            config.moka_capacity,
        ))),
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow!("redis url is required when cache backend is redis"))?;
            let cache = RedisLinkCache::connect(url, config.redis_key_prefix.clone())
                .await
                .context("failed to connect to Redis")?;
            Ok(Arc::new(cache))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
