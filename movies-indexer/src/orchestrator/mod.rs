//! Orchestrator module for the movies indexer.
//!
//! Coordinates the reader, processor, loader and checkpoint store. A cycle
//! runs one pass per [`SyncTarget`]; a pass moves every row changed since
//! the target's checkpoint into the index and then advances the checkpoint.

mod sync_target;

pub use sync_target::SyncTarget;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::TryStreamExt;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::backoff::{retry_transient, BackoffPolicy};
use crate::checkpoint::CheckpointStore;
use crate::errors::IngestError;
use crate::loader::BulkIndexer;
use crate::processor::DocumentProcessor;
use crate::reader::ChangeReader;
use movies_indexer_shared::Checkpoint;

/// Checkpoint key shared by every target in older state files.
///
/// Read only as a fallback when a target has no key of its own.
pub const LEGACY_STATE_KEY: &str = "modified";

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum rows per batch.
    pub batch_size: usize,
    /// Pause between two cycles.
    pub sync_interval: Duration,
    /// Checkpoint used when nothing is stored yet.
    pub start_date: Checkpoint,
    /// Delays before a pass that failed on a transient error starts again.
    pub backoff: BackoffPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            sync_interval: Duration::from_secs(60),
            start_date: Checkpoint::epoch(),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Result of a pass that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// At least one batch was read and indexed.
    Synced {
        documents: usize,
        skipped: usize,
        checkpoint: Checkpoint,
    },
    /// Nothing changed since the checkpoint.
    UpToDate,
}

/// What happened to one target during a cycle.
#[derive(Debug)]
pub struct PassReport {
    pub target: SyncTarget,
    pub result: Result<PassOutcome, IngestError>,
}

/// What happened during a cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub passes: Vec<PassReport>,
    /// Shutdown was requested before every target completed.
    pub interrupted: bool,
}

impl CycleReport {
    /// Documents indexed across all passes.
    pub fn documents(&self) -> usize {
        self.passes
            .iter()
            .map(|pass| match &pass.result {
                Ok(PassOutcome::Synced { documents, .. }) => *documents,
                _ => 0,
            })
            .sum()
    }

    /// Number of failed passes.
    pub fn failures(&self) -> usize {
        self.passes.iter().filter(|pass| pass.result.is_err()).count()
    }
}

/// Requests a graceful stop of a running orchestrator.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// Orchestrator that coordinates the sync components.
///
/// The orchestrator:
/// - Reads each target's checkpoint, falling back to the legacy shared key
/// - Streams changed rows through the processor and the loader
/// - Advances a checkpoint only after its whole pass succeeded
/// - Sleeps between cycles and stops on shutdown
pub struct Orchestrator {
    reader: Arc<dyn ChangeReader>,
    processor: DocumentProcessor,
    loader: BulkIndexer,
    checkpoints: Arc<dyn CheckpointStore>,
    config: OrchestratorConfig,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    /// Total number of documents indexed since startup.
    total_documents_indexed: AtomicU64,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        reader: Arc<dyn ChangeReader>,
        processor: DocumentProcessor,
        loader: BulkIndexer,
        checkpoints: Arc<dyn CheckpointStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            reader,
            processor,
            loader,
            checkpoints,
            config,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            total_documents_indexed: AtomicU64::new(0),
        }
    }

    /// Handle that stops [`Orchestrator::run`] from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Total number of documents indexed since startup.
    pub fn total_documents_indexed(&self) -> u64 {
        self.total_documents_indexed.load(Ordering::Relaxed)
    }

    /// Run cycles until shutdown is requested.
    ///
    /// Failed passes never stop the loop; their targets run again on the next
    /// cycle. Transient failures are retried inside the pass itself.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), IngestError> {
        info!(
            batch_size = self.config.batch_size,
            sync_interval_secs = self.config.sync_interval.as_secs(),
            "Starting movies indexer orchestrator"
        );

        let mut cycles: u64 = 0;

        loop {
            if self.shutdown_requested() {
                break;
            }

            let report = self.run_cycle().await;
            cycles += 1;
            if report.interrupted {
                break;
            }

            info!(
                cycle = cycles,
                documents = report.documents(),
                failures = report.failures(),
                total_documents_indexed = self.total_documents_indexed(),
                sleep_secs = self.config.sync_interval.as_secs(),
                "Cycle complete"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.config.sync_interval) => {}
                _ = wait_for_shutdown(self.shutdown_rx.clone()) => {
                    info!("Received shutdown signal");
                }
            }
        }

        info!(
            cycles,
            total_documents_indexed = self.total_documents_indexed(),
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Run one pass per target, in [`SyncTarget::ALL`] order.
    ///
    /// A failed pass is logged and the next target still runs. Shutdown is
    /// checked before each pass and interrupts a pass in progress.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for target in SyncTarget::ALL {
            if self.shutdown_requested() {
                info!(sync_target = %target, "Shutdown requested, ending cycle early");
                report.interrupted = true;
                break;
            }

            let result = self.run_pass(target).await;
            match &result {
                Ok(PassOutcome::Synced {
                    documents,
                    skipped,
                    checkpoint,
                }) => info!(
                    sync_target = %target,
                    documents,
                    skipped,
                    checkpoint = %checkpoint,
                    "Pass synced"
                ),
                Ok(PassOutcome::UpToDate) => debug!(sync_target = %target, "Pass up to date"),
                Err(IngestError::Interrupted) => {
                    info!(sync_target = %target, "Pass interrupted, checkpoint left unchanged");
                    report.interrupted = true;
                    break;
                }
                Err(e) => error!(
                    sync_target = %target,
                    error = %e,
                    "Pass failed, checkpoint left unchanged"
                ),
            }

            report.passes.push(PassReport { target, result });
        }

        report
    }

    /// Replicate everything that changed for `target` since its checkpoint.
    ///
    /// A transient failure restarts the pass from the unchanged checkpoint
    /// after the next backoff delay, for as long as it keeps failing. A
    /// shutdown request abandons the pass with [`IngestError::Interrupted`].
    #[instrument(skip(self), fields(sync_target = %target))]
    pub async fn run_pass(&self, target: SyncTarget) -> Result<PassOutcome, IngestError> {
        let attempts = retry_transient(
            &self.config.backoff,
            "sync_pass",
            || self.try_pass(target),
            IngestError::is_transient,
        );

        tokio::select! {
            result = attempts => result,
            _ = wait_for_shutdown(self.shutdown_rx.clone()) => Err(IngestError::Interrupted),
        }
    }

    /// One attempt at a pass.
    ///
    /// The checkpoint is written once, after the last batch is indexed, and
    /// only if it moved forward. A failure anywhere leaves it untouched.
    async fn try_pass(&self, target: SyncTarget) -> Result<PassOutcome, IngestError> {
        let since = self.load_checkpoint(target).await?;
        debug!(since = %since, "Reading changes since checkpoint");

        let mut batches = self.reader.read(target, since, self.config.batch_size);
        let mut high_water = since;
        let mut batch_count = 0usize;
        let mut documents = 0usize;
        let mut skipped = 0usize;

        while let Some(batch) = batches.try_next().await? {
            let processed = self.processor.process_batch(target.kind(), &batch.rows)?;
            self.loader
                .upload(target.index(), &processed.documents)
                .await?;

            batch_count += 1;
            documents += processed.documents.len();
            skipped += processed.skipped;
            high_water = high_water.max(batch.max_updated_at);
            self.total_documents_indexed
                .fetch_add(processed.documents.len() as u64, Ordering::Relaxed);

            debug!(
                batch = batch_count,
                rows = batch.len(),
                documents = processed.documents.len(),
                "Batch indexed"
            );
        }
        drop(batches);

        if batch_count == 0 {
            return Ok(PassOutcome::UpToDate);
        }

        if high_water > since {
            self.checkpoints.set(target.state_key(), high_water).await?;
        }

        Ok(PassOutcome::Synced {
            documents,
            skipped,
            checkpoint: high_water,
        })
    }

    /// The target's own checkpoint, else the legacy shared one, else the start date.
    async fn load_checkpoint(&self, target: SyncTarget) -> Result<Checkpoint, IngestError> {
        if let Some(checkpoint) = self.checkpoints.get(target.state_key()).await? {
            return Ok(checkpoint);
        }

        if let Some(checkpoint) = self.checkpoints.get(LEGACY_STATE_KEY).await? {
            debug!(sync_target = %target, "Using legacy checkpoint");
            return Ok(checkpoint);
        }

        Ok(self.config.start_date)
    }
}

/// Resolves once shutdown has been requested.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender dropped: shutdown can no longer be requested.
            std::future::pending::<()>().await;
        }
    }
}
