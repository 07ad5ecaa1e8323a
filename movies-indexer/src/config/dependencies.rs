//! Dependency initialization and wiring for the movies indexer.

use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

use super::Settings;
use crate::checkpoint::JsonFileStore;
use crate::loader::BulkIndexer;
use crate::orchestrator::Orchestrator;
use crate::processor::DocumentProcessor;
use crate::reader::PostgresChangeReader;
use crate::IndexingError;
use movies_indexer_repository::{
    IndexConfig, OpenSearchProvider, SearchIndexError, SearchIndexProvider,
};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection at a fixed interval until it succeeds.
    Retry,
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// Postgres pool backing the reader, closed on shutdown.
    pub pool: PgPool,
}

impl Dependencies {
    /// Build every component of the sync pipeline from `settings`.
    ///
    /// OpenSearch is contacted and its indices created before anything else;
    /// the Postgres pool connects lazily on the first read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (OpenSearch only in fail-fast mode)
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        let database_url = settings.require_database_url()?;

        info!(
            opensearch_url = %settings.opensearch_url,
            connection_mode = ?settings.connection_mode,
            state_file = %settings.state_file.display(),
            batch_size = settings.batch_size,
            sync_interval_secs = settings.sync_interval.as_secs(),
            malformed_row_policy = %settings.malformed_row_policy,
            "Initializing dependencies"
        );

        let search_provider = connect_to_opensearch(settings).await?;
        info!("OpenSearch connection established");

        // One connection: the pipeline reads sequentially.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(database_url)
            .map_err(|e| IndexingError::config(format!("Invalid DATABASE_URL: {}", e)))?;

        let reader = PostgresChangeReader::new(pool.clone(), settings.backoff);
        let processor = DocumentProcessor::new(settings.malformed_row_policy);
        let loader = BulkIndexer::with_backoff(Arc::new(search_provider), settings.backoff);
        let checkpoints = JsonFileStore::new(settings.state_file.clone());

        let orchestrator = Orchestrator::new(
            Arc::new(reader),
            processor,
            loader,
            Arc::new(checkpoints),
            settings.orchestrator_config(),
        );

        Ok(Self { orchestrator, pool })
    }
}

/// Connect to OpenSearch and make sure the catalog indices exist.
///
/// In [`ConnectionMode::Retry`] a failure is logged and attempted again after
/// the configured interval, forever.
pub async fn connect_to_opensearch(
    settings: &Settings,
) -> Result<OpenSearchProvider, IndexingError> {
    loop {
        match try_connect_opensearch(&settings.opensearch_url).await {
            Ok(provider) => return Ok(provider),
            Err(e) => match settings.connection_mode {
                ConnectionMode::FailFast => {
                    return Err(IndexingError::config(format!(
                        "Failed to connect to OpenSearch: {}",
                        e
                    )));
                }
                ConnectionMode::Retry => {
                    warn!(
                        opensearch_url = %settings.opensearch_url,
                        error = %e,
                        retry_interval_secs = settings.opensearch_retry_interval.as_secs(),
                        "Failed to connect to OpenSearch, retrying..."
                    );
                    sleep(settings.opensearch_retry_interval).await;
                }
            },
        }
    }
}

/// Attempt to connect to OpenSearch once.
async fn try_connect_opensearch(url: &str) -> Result<OpenSearchProvider, SearchIndexError> {
    let provider = OpenSearchProvider::new(url, IndexConfig::all()).await?;
    provider.ping().await?;
    provider.ensure_indices().await?;
    Ok(provider)
}
