//! Hot-folder processing engine.
//!
//! Orchestrates the polling discovery loop and a bounded pool of
//! per-file workers. Each file is claimed exactly once via an atomic
//! rename, processed independently, and routed to a terminal state
//! folder; one file's failure never aborts its siblings.

pub mod discovery;
pub mod lifecycle;
pub mod pipeline;

#[cfg(test)]
pub mod tests;

use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use self::discovery::FileDiscovery;
use self::lifecycle::{ClaimOutcome, StateFolders};
use self::pipeline::ProcessingPipeline;

use crate::app::models::{FileState, ProcessingStats};
use crate::app::services::location_cache::LocationCache;
use crate::app::services::plugins::PluginRegistry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::remote::RemoteStoreClient;
use crate::remote::resilience::connect_with_retry;

/// Main processor watching one hot folder
pub struct HotFolderProcessor {
    config: Config,
    registry: Arc<PluginRegistry>,
    client: Arc<dyn RemoteStoreClient>,
    cancellation: CancellationToken,
}

impl HotFolderProcessor {
    pub fn new(
        config: Config,
        registry: Arc<PluginRegistry>,
        client: Arc<dyn RemoteStoreClient>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry,
            client,
            cancellation,
        }
    }

    /// Run the discovery loop until cancellation or a voluntary exit
    /// condition, then drain in-flight workers.
    pub async fn run(&self) -> Result<ProcessingStats> {
        let start = Instant::now();
        self.config.validate()?;

        let folders = Arc::new(StateFolders::new(&self.config));
        folders.ensure_exist().await?;
        let discovery = FileDiscovery::new(&self.config)?;

        connect_with_retry(
            self.client.as_ref(),
            &self.config.server_address,
            self.config.max_connection_attempts,
            self.config.connection_retry_delay(),
        )
        .await?;

        let locations = Arc::new(LocationCache::new());
        let pipeline = Arc::new(ProcessingPipeline::new(
            self.registry.clone(),
            self.client.clone(),
            locations,
            &self.config,
        ));

        let worker_count = self.config.worker_count();
        info!(
            "Watching {} with {} worker(s), polling every {:?}",
            self.config.hot_folder.display(),
            worker_count,
            self.config.polling_interval()
        );

        let semaphore = Arc::new(Semaphore::new(worker_count));
        let stats = Arc::new(Mutex::new(ProcessingStats::default()));
        let mut workers = JoinSet::new();
        let mut claimed_total = 0usize;
        let mut last_activity = Instant::now();

        'discovery: loop {
            if self.cancellation.is_cancelled() {
                info!("Cancellation observed, stopping discovery");
                break;
            }

            let files = match discovery.scan().await {
                Ok(files) => files,
                Err(e) => {
                    warn!("Scan failed, will retry next poll: {}", e);
                    Vec::new()
                }
            };

            for path in files {
                if self.cancellation.is_cancelled() {
                    info!("Cancellation observed, not claiming further files");
                    break 'discovery;
                }
                if let Some(max) = self.config.max_files_processed
                    && claimed_total >= max
                {
                    info!("Processed {} file(s), reaching the configured maximum", max);
                    break 'discovery;
                }

                let permit = tokio::select! {
                    _ = self.cancellation.cancelled() => break 'discovery,
                    permit = semaphore.clone().acquire_owned() => permit
                        .map_err(|_| Error::processing_interrupted("worker pool closed"))?,
                };

                match folders.claim(&path).await {
                    Ok(ClaimOutcome::Claimed(record)) => {
                        claimed_total += 1;
                        last_activity = Instant::now();

                        let pipeline = pipeline.clone();
                        let folders = folders.clone();
                        let stats = stats.clone();
                        workers.spawn(async move {
                            process_claimed(pipeline, folders, stats, record).await;
                            drop(permit);
                        });
                    }
                    Ok(ClaimOutcome::AlreadyTaken) => {
                        debug!("{} already taken, skipping", path.display());
                        stats.lock().expect("stats lock poisoned").files_vanished += 1;
                    }
                    Err(e) => {
                        error!("Could not claim {}: {}", path.display(), e);
                    }
                }
            }

            if let Some(max_idle) = self.config.max_idle()
                && last_activity.elapsed() >= max_idle
            {
                info!("Idle for {:?}, exiting voluntarily", last_activity.elapsed());
                break;
            }

            tokio::select! {
                _ = self.cancellation.cancelled() => break,
                _ = tokio::time::sleep(self.config.polling_interval()) => {}
            }
        }

        // Let in-flight workers finish their state transitions
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }

        let mut final_stats = stats.lock().expect("stats lock poisoned").clone();
        final_stats.processing_time_ms = start.elapsed().as_millis();
        Ok(final_stats)
    }
}

/// Process one claimed file to its terminal folder, updating shared
/// counters. Runs entirely inside a worker task.
async fn process_claimed(
    pipeline: Arc<ProcessingPipeline>,
    folders: Arc<StateFolders>,
    stats: Arc<Mutex<ProcessingStats>>,
    record: crate::app::models::FileRecord,
) {
    let mut record = record;
    let result = pipeline.process_file(&record).await;

    if let Some(e) = &result.error {
        error!("{}: {}", record.path.display(), e);
    }

    match folders.transition(&mut record, result.outcome).await {
        Ok(()) => debug!(
            "{} settled as {:?}",
            record.path.display(),
            record.state
        ),
        Err(e) => error!(
            "Could not move {} to {:?}; file may be stranded in Processing: {}",
            record.path.display(),
            result.outcome,
            e
        ),
    }

    let mut stats = stats.lock().expect("stats lock poisoned");
    match result.outcome {
        FileState::Uploaded => stats.files_uploaded += 1,
        FileState::PartialUpload => stats.files_partial += 1,
        FileState::Failed => stats.files_failed += 1,
        FileState::Discovered | FileState::Processing => {}
    }
    stats.visits_uploaded += result.visits_uploaded;
    stats.visits_skipped += result.visits_skipped;
}
