//! Disposable MySQL and Redis containers for integration tests.

pub mod error;
pub mod mysql;
pub mod redis;

pub use error::{Result, TestInfraError};

use testcontainers::{ContainerAsync, GenericImage};

/// Host and mapped port of a started container.
async fn endpoint(container: &ContainerAsync<GenericImage>, port: u16) -> Result<(String, u16)> {
    let host = match container.get_host().await?.to_string() {
        // Published ports are bound on IPv4 only.
        host if host == "localhost" => "127.0.0.1".to_owned(),
        host => host,
    };
    let port = container.get_host_port_ipv4(port).await?;
    Ok((host, port))
}
