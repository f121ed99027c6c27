//! Scriptable converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::converter::{
    candidate_path, ConversionRequest, ConversionResult, Converter, JobProgress,
};

#[derive(Debug, Default)]
struct ScriptState {
    failures: HashMap<PathBuf, String>,
    delays: HashMap<PathBuf, Duration>,
    default_delay: Duration,
    steps: u32,
    started: Vec<PathBuf>,
    completed: Vec<PathBuf>,
    running: usize,
    peak_running: usize,
    releases: usize,
}

/// Converter whose per-file outcome and timing are set up by the test.
///
/// Provides controllable behavior for testing:
/// - Fail specific inputs with a given message
/// - Delay specific inputs to reorder completion
/// - Track start/completion order and peak concurrency
///
/// Clones share state, so a test can keep a handle after moving one into a pool.
#[derive(Debug, Clone)]
pub struct ScriptedConverter {
    state: Arc<Mutex<ScriptState>>,
}

impl Default for ScriptedConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConverter {
    /// Create a new scripted converter; every job succeeds instantly with two ticks.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                steps: 2,
                ..Default::default()
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ScriptState) -> R) -> R {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }

    /// Make the job for `input` fail with `message`.
    pub fn fail_on(&self, input: impl AsRef<Path>, message: impl Into<String>) {
        let input = input.as_ref().to_path_buf();
        let message = message.into();
        self.with_state(|s| {
            s.failures.insert(input, message);
        });
    }

    /// Delay the job for `input` before it completes.
    pub fn set_delay(&self, input: impl AsRef<Path>, delay: Duration) {
        let input = input.as_ref().to_path_buf();
        self.with_state(|s| {
            s.delays.insert(input, delay);
        });
    }

    /// Delay applied to inputs without an explicit delay.
    pub fn set_default_delay(&self, delay: Duration) {
        self.with_state(|s| s.default_delay = delay);
    }

    /// Number of progress ticks reported by successful jobs.
    pub fn set_steps(&self, steps: u32) {
        self.with_state(|s| s.steps = steps);
    }

    /// Inputs in the order their jobs started.
    pub fn started_order(&self) -> Vec<PathBuf> {
        self.with_state(|s| s.started.clone())
    }

    /// Inputs in the order their jobs completed.
    pub fn completion_order(&self) -> Vec<PathBuf> {
        self.with_state(|s| s.completed.clone())
    }

    /// Highest number of jobs observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.with_state(|s| s.peak_running)
    }

    /// How many times `release` was called.
    pub fn release_count(&self) -> usize {
        self.with_state(|s| s.releases)
    }
}

#[async_trait]
impl Converter for ScriptedConverter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn convert(
        &self,
        request: &ConversionRequest,
        progress: &mut JobProgress,
    ) -> ConversionResult {
        let input = request.input_path().to_path_buf();
        let (delay, failure, steps) = self.with_state(|s| {
            s.started.push(input.clone());
            s.running += 1;
            s.peak_running = s.peak_running.max(s.running);
            (
                s.delays.get(&input).copied().unwrap_or(s.default_delay),
                s.failures.get(&input).cloned(),
                s.steps,
            )
        });

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let output = candidate_path(
            &input,
            request.output_dir(),
            request.settings().format().extension(),
        );

        let result = match failure {
            Some(message) => {
                progress.report(0.5);
                ConversionResult::failed(&input, Some(output), message)
            }
            None => {
                for step in 1..=steps {
                    progress.report(f64::from(step) / f64::from(steps));
                }
                progress.finish();
                ConversionResult::succeeded(&input, output, "OK")
            }
        };

        self.with_state(|s| {
            s.running -= 1;
            s.completed.push(input.clone());
        });
        result
    }

    fn release(&self) {
        self.with_state(|s| s.releases += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{AudioFormat, ConversionSettings, NoopProgress};

    fn request(input: &str) -> ConversionRequest {
        let settings = ConversionSettings::builder(AudioFormat::Flac).build().unwrap();
        ConversionRequest::new(input, "/out", settings)
    }

    #[tokio::test]
    async fn test_success_uses_candidate_path() {
        let converter = ScriptedConverter::new();
        let mut progress = JobProgress::new("a.wav", 1, 1, Arc::new(NoopProgress));

        let result = converter.convert(&request("/in/a.wav"), &mut progress).await;
        assert!(result.success);
        assert_eq!(result.output_path, Some(PathBuf::from("/out/a.flac")));
        assert_eq!(progress.last(), Some(1.0));
        assert_eq!(converter.completion_order(), vec![PathBuf::from("/in/a.wav")]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let converter = ScriptedConverter::new();
        converter.fail_on("/in/bad.wav", "boom");
        let mut progress = JobProgress::new("bad.wav", 1, 1, Arc::new(NoopProgress));

        let result = converter.convert(&request("/in/bad.wav"), &mut progress).await;
        assert!(!result.success);
        assert_eq!(result.message, "boom");
        assert_eq!(progress.last(), Some(0.5));
    }

    #[test]
    fn test_clones_share_state() {
        let converter = ScriptedConverter::new();
        let clone = converter.clone();
        clone.release();
        assert_eq!(converter.release_count(), 1);
    }
}
