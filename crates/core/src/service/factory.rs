//! Backend selection at startup.

use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::converter::{ConversionBackend, FfmpegConverter, SimulatedConverter, ToolLocator};
use crate::processor::WorkerPool;

/// Which kind of backend is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Real conversions through ffmpeg.
    Process,
    /// Fabricated progress; ffmpeg was not found.
    Simulated,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => f.write_str("process"),
            Self::Simulated => f.write_str("simulated"),
        }
    }
}

/// The chosen backend plus what the caller should know about it.
pub struct BackendSelection {
    pub backend: Arc<dyn ConversionBackend>,
    pub mode: BackendMode,
    /// Set in simulated mode; meant to be shown to the user once.
    pub notice: Option<String>,
}

impl BackendSelection {
    /// A process-mode selection around an existing backend.
    pub fn process(backend: Arc<dyn ConversionBackend>) -> Self {
        Self {
            backend,
            mode: BackendMode::Process,
            notice: None,
        }
    }

    /// A simulated-mode selection carrying a degraded notice.
    pub fn simulated(backend: Arc<dyn ConversionBackend>, notice: impl Into<String>) -> Self {
        Self {
            backend,
            mode: BackendMode::Simulated,
            notice: Some(notice.into()),
        }
    }
}

impl fmt::Debug for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelection")
            .field("backend", &self.backend.name())
            .field("mode", &self.mode)
            .field("notice", &self.notice)
            .finish()
    }
}

/// Discovers ffmpeg as configured and builds the matching backend.
pub async fn select_backend(config: &Config) -> BackendSelection {
    let locator = ToolLocator::from_config(&config.converter);
    select_backend_with(&locator, config).await
}

/// Like [`select_backend`], with an explicit locator.
pub async fn select_backend_with(locator: &ToolLocator, config: &Config) -> BackendSelection {
    let workers = config.converter.worker_count();

    match locator.locate().await {
        Some(tools) => {
            info!(
                "Using ffmpeg at {:?} (ffprobe {:?}) with {} workers",
                tools.ffmpeg, tools.ffprobe, workers
            );
            let converter = FfmpegConverter::new(config.converter.clone(), tools);
            BackendSelection::process(Arc::new(WorkerPool::new(converter, workers)))
        }
        None => {
            let notice = "FFmpeg not found. Running in simulated mode: \
                          no files will be written."
                .to_string();
            info!("ffmpeg/ffprobe not found, falling back to simulated converter");
            let converter = SimulatedConverter::new(config.simulation.clone());
            BackendSelection::simulated(Arc::new(WorkerPool::new(converter, workers)), notice)
        }
    }
}
