use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::{Client, ClientLike, KeysInterface, ReconnectPolicy, Server, ServerConfig};
use fred::types::{Builder, Expiration};
use tracing::{debug, info};

use crate::errors::CacheError;
use crate::interfaces::CacheProvider;

#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Host on which Redis is running (default: localhost)
    pub host: String,
    /// Port on which Redis is running (default: 6379)
    pub port: u16,
    /// Redis user name
    pub username: Option<String>,
    /// Redis password
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
        }
    }
}

/// Cache backed by a single Redis node.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    /// Connect to Redis and wait until the connection is up.
    pub async fn connect(config: RedisConfig) -> Result<Self, CacheError> {
        let client = Builder::default_centralized()
            .with_config(|redis_config| {
                redis_config.username = config.username.clone();
                redis_config.password = config.password.clone();
                redis_config.server = ServerConfig::Centralized {
                    server: Server::new(config.host.clone(), config.port),
                };
            })
            .with_performance_config(|perf| {
                perf.default_command_timeout = Duration::from_secs(5);
            })
            .set_policy(ReconnectPolicy::new_exponential(0, 100, 2000, 2))
            .build()
            .map_err(|e| CacheError::connection(e.to_string()))?;

        client
            .init()
            .await
            .map_err(|e| CacheError::connection(e.to_string()))?;

        info!(host = %config.host, port = config.port, "Connected to Redis");

        Ok(Self { client })
    }
}

#[async_trait]
impl CacheProvider for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self
            .client
            .get(key)
            .await
            .map_err(|e| CacheError::command(e.to_string()))?;

        debug!(key, hit = value.is_some(), "Cache lookup");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);

        self.client
            .set::<(), _, _>(key, value, Some(Expiration::EX(seconds)), None, false)
            .await
            .map_err(|e| CacheError::command(e.to_string()))
    }

    /// Send `QUIT` and stop reconnecting.
    async fn close(&self) -> Result<(), CacheError> {
        self.client
            .quit()
            .await
            .map_err(|e| CacheError::connection(e.to_string()))
    }
}
