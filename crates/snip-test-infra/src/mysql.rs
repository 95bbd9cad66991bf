use crate::{endpoint, Result};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone, TypedBuilder)]
pub struct MySqlConfig {
    #[builder(default = "8.4".to_string(), setter(into))]
    image_tag: String,
    #[builder(default = "snip".to_string(), setter(into))]
    database: String,
    #[builder(default = "snip".to_string(), setter(into))]
    user: String,
    #[builder(default = "snip".to_string(), setter(into))]
    password: String,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A MySQL server living as long as this value.
///
/// The server logs "ready for connections" once during initialization and
/// again after its restart, so callers should still retry their first
/// connection.
pub struct MySqlServer {
    _container: ContainerAsync<GenericImage>,
    dsn: String,
}

impl MySqlServer {
    pub async fn start(config: MySqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", &config.image_tag)
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", &config.database)
            .with_env_var("MYSQL_USER", &config.user)
            .with_env_var("MYSQL_PASSWORD", &config.password)
            .with_env_var("MYSQL_ROOT_PASSWORD", &config.password)
            .start()
            .await?;

        let (host, port) = endpoint(&container, MYSQL_PORT).await?;
        let dsn = format!(
            "mysql://{}:{}@{host}:{port}/{}",
            config.user, config.password, config.database
        );

        Ok(Self {
            _container: container,
            dsn,
        })
    }

    /// Connection string for the configured database and user.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}
