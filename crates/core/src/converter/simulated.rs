//! Simulated converter used when no encoder is available.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::config::SimulationConfig;
use super::error::JobError;
use super::resolver::{candidate_path, resolve_output, ResolvedOutput};
use super::traits::Converter;
use super::types::{ConversionRequest, ConversionResult, JobProgress};

/// Suffix appended to the resolved output name.
pub const SIMULATED_SUFFIX: &str = ".simulated";

/// Fabricates timed progress without touching any media.
///
/// Every job reports exactly `steps` evenly spaced ticks and succeeds with a
/// synthetic output path. Nothing is written to disk.
#[derive(Debug, Default)]
pub struct SimulatedConverter {
    config: SimulationConfig,
    released: AtomicBool,
}

impl SimulatedConverter {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            released: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Resolved output with the marker suffix appended.
    fn synthetic_output(request: &ConversionRequest) -> PathBuf {
        let settings = request.settings();
        let extension = settings.format().extension();
        // Output is never written, so a skip still yields a name.
        let resolved = resolve_output(
            request.input_path(),
            request.output_dir(),
            extension,
            settings.overwrite_policy(),
        )
        .ok()
        .and_then(ResolvedOutput::into_path)
        .unwrap_or_else(|| candidate_path(request.input_path(), request.output_dir(), extension));

        let mut name = OsString::from(resolved.as_os_str());
        name.push(SIMULATED_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait]
impl Converter for SimulatedConverter {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn convert(
        &self,
        request: &ConversionRequest,
        progress: &mut JobProgress,
    ) -> ConversionResult {
        if self.released.load(Ordering::Acquire) {
            return ConversionResult::failed(
                request.input_path(),
                None,
                JobError::Cancelled.message(),
            );
        }

        let steps = self.config.steps.max(1);
        let delay = self.config.step_delay();
        for step in 1..=steps {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            progress.report(f64::from(step) / f64::from(steps));
        }

        let output = Self::synthetic_output(request);
        debug!(
            "Simulated {:?} -> {:?} in {} steps",
            request.input_path(),
            output,
            steps
        );
        ConversionResult::succeeded(request.input_path(), output, "Simulated OK")
    }

    fn release(&self) {
        self.released.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{
        AudioFormat, ConversionSettings, NoopProgress, OverwritePolicy, ProgressSink,
    };
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn request(
        input: &str,
        output_dir: &std::path::Path,
        policy: OverwritePolicy,
    ) -> ConversionRequest {
        let settings = ConversionSettings::builder(AudioFormat::Mp3)
            .overwrite_policy(policy)
            .build()
            .unwrap();
        ConversionRequest::new(input, output_dir, settings)
    }

    #[tokio::test]
    async fn test_reports_fixed_number_of_ticks() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: Arc<dyn ProgressSink> = Arc::new(move |name: &str, p: f64, i: usize, n: usize| {
            sink_seen.lock().unwrap().push((name.to_string(), p, i, n));
        });

        let converter = SimulatedConverter::new(SimulationConfig::instant(20));
        let req = request("/music/song.wav", temp.path(), OverwritePolicy::Rename);
        let mut progress = JobProgress::new(req.display_name(), 2, 3, sink);

        let result = converter.convert(&req, &mut progress).await;

        assert!(result.success);
        assert_eq!(
            result.output_path,
            Some(temp.path().join("song.mp3.simulated"))
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 20);
        assert_eq!(seen[0], ("song.wav".to_string(), 0.05, 2, 3));
        assert_eq!(seen[19].1, 1.0);
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[tokio::test]
    async fn test_synthetic_name_follows_rename_policy() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("song.mp3"), b"").unwrap();

        let converter = SimulatedConverter::new(SimulationConfig::instant(2));
        let req = request("song.wav", temp.path(), OverwritePolicy::Rename);
        let mut progress = JobProgress::new("song.wav", 1, 1, Arc::new(NoopProgress));

        let result = converter.convert(&req, &mut progress).await;
        assert_eq!(
            result.output_path,
            Some(temp.path().join("song(1).mp3.simulated"))
        );
    }

    #[tokio::test]
    async fn test_skip_policy_still_succeeds() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("song.mp3"), b"").unwrap();

        let converter = SimulatedConverter::new(SimulationConfig::instant(4));
        let req = request("song.wav", temp.path(), OverwritePolicy::Skip);
        let mut progress = JobProgress::new("song.wav", 1, 1, Arc::new(NoopProgress));

        let result = converter.convert(&req, &mut progress).await;
        assert!(result.success);
        assert_eq!(progress.ticks(), 4);
        assert_eq!(
            result.output_path,
            Some(temp.path().join("song.mp3.simulated"))
        );
    }

    #[tokio::test]
    async fn test_released_converter_refuses_jobs() {
        let converter = SimulatedConverter::default();
        converter.release();

        let req = request("song.wav", std::path::Path::new("/out"), OverwritePolicy::Rename);
        let mut progress = JobProgress::new("song.wav", 1, 1, Arc::new(NoopProgress));
        let result = converter.convert(&req, &mut progress).await;
        assert!(!result.success);
        assert_eq!(progress.ticks(), 0);
    }
}
