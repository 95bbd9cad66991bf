use crate::{endpoint, Result};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const REDIS_IMAGE_TAG: &str = "8.6.0";
const REDIS_PORT: u16 = 6379;

/// A standalone Redis server living as long as this value.
pub struct RedisServer {
    _container: ContainerAsync<GenericImage>,
    url: String,
}

impl RedisServer {
    pub async fn start() -> Result<Self> {
        let container = GenericImage::new("redis", REDIS_IMAGE_TAG)
            .with_exposed_port(REDIS_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await?;

        let (host, port) = endpoint(&container, REDIS_PORT).await?;
        Ok(Self {
            _container: container,
            url: format!("redis://{host}:{port}"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
