//! Movies Indexer Main Entry Point
//!
//! Polls the catalog database for changes and indexes them into OpenSearch
//! until interrupted.

use dotenv::dotenv;
use movies_indexer::{Dependencies, IndexingError, Settings};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("movies_indexer=info,movies_indexer_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to init tracing: {}", e)))?;

        info!(
            service_name = "movies-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to init tracing: {}", e)))?;

        info!(
            service_name = "movies-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting movies indexer");

    let settings = Settings::from_env()?;

    let deps = match Dependencies::new(&settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let shutdown = deps.orchestrator.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Received Ctrl-C, shutting down (press again to exit immediately)");
        shutdown.shutdown();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received second Ctrl-C, exiting without cleanup");
            std::process::exit(130);
        }
    });

    let result = deps.orchestrator.run().await;
    deps.pool.close().await;

    match result {
        Ok(()) => {
            info!("Movies indexer stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Movies indexer failed");
            Err(e.into())
        }
    }
}
