//! Progress sink that records ticks for assertions.

use std::sync::Mutex;

use crate::converter::ProgressSink;

/// One recorded progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTick {
    pub file_name: String,
    pub progress: f64,
    pub index: usize,
    pub total: usize,
}

/// Records every tick it receives, from any thread.
#[derive(Debug, Default)]
pub struct RecordingSink {
    ticks: Mutex<Vec<ProgressTick>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All ticks in arrival order.
    pub fn ticks(&self) -> Vec<ProgressTick> {
        self.ticks.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Ticks reported for one file, in arrival order.
    pub fn ticks_for(&self, file_name: &str) -> Vec<ProgressTick> {
        self.ticks()
            .into_iter()
            .filter(|t| t.file_name == file_name)
            .collect()
    }

    /// Progress values reported for one file.
    pub fn progress_for(&self, file_name: &str) -> Vec<f64> {
        self.ticks_for(file_name)
            .into_iter()
            .map(|t| t.progress)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut ticks) = self.ticks.lock() {
            ticks.clear();
        }
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, file_name: &str, progress: f64, index: usize, total: usize) {
        if let Ok(mut ticks) = self.ticks.lock() {
            ticks.push(ProgressTick {
                file_name: file_name.to_string(),
                progress,
                index,
                total,
            });
        }
    }
}
