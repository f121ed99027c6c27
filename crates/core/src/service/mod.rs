//! Conversion service facade.
//!
//! Owns the single active backend for the life of the process:
//! - **Startup**: picks ffmpeg or the simulated converter once
//! - **Submit**: validates the batch, then hands it to the worker pool
//! - **Teardown**: `shutdown()` releases the backend; later batches fail

mod factory;
mod handle;

pub use factory::{select_backend, select_backend_with, BackendMode, BackendSelection};
pub use handle::{BatchHandle, BatchOutcome};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::converter::{
    validate_batch, ConversionBackend, ConversionRequest, ConverterError, ProgressSink,
};

/// Entry point for batch conversions.
pub struct ConversionService {
    backend: Arc<dyn ConversionBackend>,
    mode: BackendMode,
    notice: Option<String>,
    notice_taken: AtomicBool,
    shut_down: AtomicBool,
}

impl ConversionService {
    /// Creates a service around an already selected backend.
    pub fn new(selection: BackendSelection) -> Self {
        info!(
            "Conversion service ready ({} backend, {} mode)",
            selection.backend.name(),
            selection.mode
        );
        Self {
            backend: selection.backend,
            mode: selection.mode,
            notice: selection.notice,
            notice_taken: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Discovers ffmpeg per `config` and creates the service.
    pub async fn from_config(config: &Config) -> Self {
        Self::new(select_backend(config).await)
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// True when running on the simulated backend.
    pub fn is_degraded(&self) -> bool {
        self.mode == BackendMode::Simulated
    }

    /// Returns the degraded-mode notice the first time it is called, then `None`.
    pub fn take_degraded_notice(&self) -> Option<String> {
        let notice = self.notice.as_ref()?;
        if self.notice_taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(notice.clone())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Submits a batch.
    ///
    /// Validation runs before this returns; a rejected batch yields a handle
    /// that is already failed and no job starts. Otherwise the batch runs on
    /// the Tokio runtime, which must be active when this is called.
    pub fn convert(
        &self,
        requests: Vec<ConversionRequest>,
        sink: Arc<dyn ProgressSink>,
    ) -> BatchHandle {
        if self.is_shut_down() {
            return BatchHandle::failed(ConverterError::ShutDown);
        }

        if let Err(e) = validate_batch(&requests) {
            warn!("Batch of {} rejected: {}", requests.len(), e);
            return BatchHandle::failed(e.into());
        }

        debug!("Submitting batch of {} to {}", requests.len(), self.backend.name());
        let backend = Arc::clone(&self.backend);
        BatchHandle::spawned(tokio::spawn(async move {
            backend.run_batch(requests, sink).await
        }))
    }

    /// Releases the backend. Later calls do nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Shutting down conversion service");
        self.backend.release();
    }
}

impl Drop for ConversionService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{NoopProgress, OverwritePolicy, SimulatedConverter, SimulationConfig};
    use crate::processor::WorkerPool;
    use crate::testing::fixtures;
    use crate::testing::{RecordingSink, ScriptedConverter};
    use tempfile::TempDir;

    fn scripted_service(converter: ScriptedConverter) -> ConversionService {
        ConversionService::new(BackendSelection::process(Arc::new(WorkerPool::new(
            converter, 2,
        ))))
    }

    #[tokio::test]
    async fn test_convert_runs_valid_batch() {
        let temp = TempDir::new().unwrap();
        let inputs = fixtures::input_files(temp.path(), &["a.wav", "b.wav"]).unwrap();
        let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();
        let sink = Arc::new(RecordingSink::new());

        let service = scripted_service(ScriptedConverter::new());
        let results = service
            .convert(
                fixtures::requests(&inputs, &temp.path().join("out"), &settings),
                sink.clone(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(results[0].input_path, inputs[0]);
        assert!(!sink.ticks().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_batch_never_reaches_backend() {
        let temp = TempDir::new().unwrap();
        let inputs = fixtures::input_files(temp.path(), &["a.wav"]).unwrap();
        let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();
        let doubled = vec![inputs[0].clone(), inputs[0].clone()];

        let converter = ScriptedConverter::new();
        let service = scripted_service(converter.clone());
        let err = service
            .convert(
                fixtures::requests(&doubled, temp.path(), &settings),
                Arc::new(NoopProgress),
            )
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(err.to_string().starts_with("Duplicate file detected"));
        assert!(converter.started_order().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let converter = ScriptedConverter::new();
        let service = scripted_service(converter.clone());

        service.shutdown();
        service.shutdown();
        assert!(service.is_shut_down());
        assert_eq!(converter.release_count(), 1);

        let err = service
            .convert(Vec::new(), Arc::new(NoopProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::ShutDown));
    }

    #[test]
    fn test_degraded_notice_is_taken_once() {
        let backend = Arc::new(WorkerPool::new(
            SimulatedConverter::new(SimulationConfig::instant(1)),
            2,
        ));
        let service = ConversionService::new(BackendSelection::simulated(backend, "no ffmpeg"));

        assert!(service.is_degraded());
        assert_eq!(service.take_degraded_notice().as_deref(), Some("no ffmpeg"));
        assert_eq!(service.take_degraded_notice(), None);
        assert!(service.is_degraded());
    }

    #[test]
    fn test_process_mode_has_no_notice() {
        let service = scripted_service(ScriptedConverter::new());
        assert!(!service.is_degraded());
        assert_eq!(service.take_degraded_notice(), None);
        assert_eq!(service.backend_name(), "scripted");
    }
}
