//! Configuration for the movies indexer.
//!
//! Settings come from environment variables, optionally loaded from a `.env`
//! file by the binaries. Unset variables take their defaults; a value that
//! does not parse is a configuration error.

mod dependencies;

pub use dependencies::{connect_to_opensearch, ConnectionMode, Dependencies};

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::backoff::{
    BackoffPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CEILING, DEFAULT_BACKOFF_FACTOR,
};
use crate::orchestrator::OrchestratorConfig;
use crate::processor::MalformedRowPolicy;
use crate::IndexingError;
use movies_indexer_repository::cache::RedisConfig;
use movies_indexer_shared::Checkpoint;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default checkpoint file.
const DEFAULT_STATE_FILE: &str = "state.json";

/// Default number of rows per batch.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Default pause between cycles in seconds.
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Default OpenSearch connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Everything the indexer and the catalog CLI read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string. Only the indexer needs it.
    pub database_url: Option<String>,
    pub opensearch_url: String,
    pub connection_mode: ConnectionMode,
    pub opensearch_retry_interval: Duration,
    pub redis: RedisConfig,
    pub batch_size: usize,
    pub sync_interval: Duration,
    pub backoff: BackoffPolicy,
    pub start_date: Checkpoint,
    pub state_file: PathBuf,
    pub malformed_row_policy: MalformedRowPolicy,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: Postgres connection string (required by the indexer)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `REDIS_HOST` / `REDIS_PORT`: Cache location (default: localhost / 6379)
    /// - `REDIS_USERNAME` / `REDIS_PASSWORD`: Optional cache credentials
    /// - `BATCH_SIZE`: Rows per batch (default: 100)
    /// - `SYNC_INTERVAL_SECS`: Pause between cycles (default: 60)
    /// - `BACKOFF_BASE_MS` / `BACKOFF_FACTOR` / `BACKOFF_MAX_MS`: Retry delays
    ///   (default: 100 / 2 / 10000)
    /// - `START_DATE`: Checkpoint used when none is stored (default: 1970-01-01T00:00:00Z)
    /// - `STATE_FILE`: Checkpoint file (default: state.json)
    /// - `MALFORMED_ROW_POLICY`: "halt" or "skip" (default: halt)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let batch_size: usize = parse_var(&var, "BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(IndexingError::config("BATCH_SIZE must be at least 1"));
        }

        let backoff = BackoffPolicy::new(
            Duration::from_millis(parse_var(
                &var,
                "BACKOFF_BASE_MS",
                DEFAULT_BACKOFF_BASE.as_millis() as u64,
            )?),
            parse_var(&var, "BACKOFF_FACTOR", DEFAULT_BACKOFF_FACTOR)?,
            Duration::from_millis(parse_var(
                &var,
                "BACKOFF_MAX_MS",
                DEFAULT_BACKOFF_CEILING.as_millis() as u64,
            )?),
        );
        if backoff.factor == 0 {
            return Err(IndexingError::config("BACKOFF_FACTOR must be at least 1"));
        }

        let start_date = match var("START_DATE") {
            Some(value) => Checkpoint::parse(&value)
                .map_err(|e| IndexingError::config(format!("Invalid START_DATE: {}", e)))?,
            None => Checkpoint::epoch(),
        };

        let redis = RedisConfig {
            host: var("REDIS_HOST").unwrap_or_else(|| RedisConfig::default().host),
            port: parse_var(&var, "REDIS_PORT", RedisConfig::default().port)?,
            username: var("REDIS_USERNAME"),
            password: var("REDIS_PASSWORD"),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            opensearch_url: var("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            connection_mode: ConnectionMode::parse(var("OPENSEARCH_CONNECTION_MODE")),
            opensearch_retry_interval: Duration::from_secs(parse_var(
                &var,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )?),
            redis,
            batch_size,
            sync_interval: Duration::from_secs(parse_var(
                &var,
                "SYNC_INTERVAL_SECS",
                DEFAULT_SYNC_INTERVAL_SECS,
            )?),
            backoff,
            start_date,
            state_file: var("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            malformed_row_policy: parse_var(
                &var,
                "MALFORMED_ROW_POLICY",
                MalformedRowPolicy::default(),
            )?,
        })
    }

    /// The Postgres connection string, which the indexer cannot run without.
    pub fn require_database_url(&self) -> Result<&str, IndexingError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| IndexingError::config("DATABASE_URL is required"))
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            batch_size: self.batch_size,
            sync_interval: self.sync_interval,
            start_date: self.start_date,
            backoff: self.backoff,
        }
    }
}

impl ConnectionMode {
    /// Parse the connection mode, defaulting to retry when unset or unknown.
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            other => {
                warn!(value = other, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

fn parse_var<T, F>(var: &F, name: &str, default: T) -> Result<T, IndexingError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| IndexingError::config(format!("Invalid {} '{}': {}", name, value, e))),
        None => Ok(default),
    }
}
