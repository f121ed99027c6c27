//! Worker pool implementation.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::converter::{
    ConversionBackend, ConversionRequest, ConversionResult, Converter, ConverterError, JobError,
    JobProgress, ProgressSink,
};

use super::types::{PoolStats, PoolStatus};

/// Runs batches on a fixed number of workers.
///
/// Jobs are independent: one failing never affects the others, and every
/// request gets exactly one result in the original order.
pub struct WorkerPool<C: Converter> {
    converter: Arc<C>,
    semaphore: Arc<Semaphore>,
    workers: usize,
    stats: Arc<PoolStats>,
    closed: AtomicBool,
}

impl<C: Converter + 'static> WorkerPool<C> {
    /// Creates a pool with `workers` concurrent slots (at least one).
    pub fn new(converter: C, workers: usize) -> Self {
        Self::from_arc(Arc::new(converter), workers)
    }

    /// Creates a pool around a shared converter.
    pub fn from_arc(converter: Arc<C>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            converter,
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            stats: Arc::new(PoolStats::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn converter(&self) -> &Arc<C> {
        &self.converter
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the current pool status.
    pub fn status(&self) -> PoolStatus {
        self.stats
            .to_status(self.converter.name(), self.workers, self.is_closed())
    }

    fn spawn_job(
        &self,
        request: ConversionRequest,
        index: usize,
        total: usize,
        sink: Arc<dyn ProgressSink>,
    ) -> tokio::task::JoinHandle<ConversionResult> {
        let converter = Arc::clone(&self.converter);
        let semaphore = Arc::clone(&self.semaphore);
        let stats = Arc::clone(&self.stats);

        stats.queued.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await;
            stats.queued.fetch_sub(1, Ordering::Relaxed);

            let _permit = match permit {
                Ok(permit) => permit,
                Err(_) => {
                    // Pool released before this job got a worker
                    stats.record(false);
                    return ConversionResult::failed(
                        request.input_path(),
                        None,
                        JobError::Cancelled.message(),
                    );
                }
            };

            stats.active.fetch_add(1, Ordering::Relaxed);
            let mut progress = JobProgress::new(request.display_name(), index, total, sink);
            let result = converter.convert(&request, &mut progress).await;
            stats.active.fetch_sub(1, Ordering::Relaxed);
            stats.record(result.success);

            debug!(
                "Job {}/{} finished: {:?} success={}",
                index, total, result.input_path, result.success
            );
            result
        })
    }
}

#[async_trait]
impl<C: Converter + 'static> ConversionBackend for WorkerPool<C> {
    fn name(&self) -> &str {
        self.converter.name()
    }

    async fn run_batch(
        &self,
        requests: Vec<ConversionRequest>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Vec<ConversionResult>, ConverterError> {
        if self.is_closed() {
            return Err(ConverterError::ShutDown);
        }

        let batch_id = Uuid::new_v4();
        let total = requests.len();
        let start = Instant::now();
        info!(
            "Batch {} started: {} jobs on {} workers ({})",
            batch_id,
            total,
            self.workers,
            self.converter.name()
        );

        // Inputs are kept aside so a crashed task still yields a result.
        let mut inputs: Vec<PathBuf> = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);
        for (idx, request) in requests.into_iter().enumerate() {
            inputs.push(request.input_path().to_path_buf());
            handles.push(self.spawn_job(request, idx + 1, total, Arc::clone(&sink)));
        }

        let joined = futures::future::join_all(handles).await;

        let results: Vec<ConversionResult> = inputs
            .into_iter()
            .zip(joined)
            .map(|(input, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("Conversion task for {:?} failed: {}", input, e);
                    self.stats.record(false);
                    ConversionResult::failed(input, None, format!("Conversion task failed: {}", e))
                }
            })
            .collect();

        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            "Batch {} finished in {} ms: {} succeeded, {} failed",
            batch_id,
            start.elapsed().as_millis(),
            total - failed,
            failed
        );

        Ok(results)
    }

    fn release(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Releasing {} worker pool", self.converter.name());
        self.semaphore.close();
        self.converter.release();
    }
}
