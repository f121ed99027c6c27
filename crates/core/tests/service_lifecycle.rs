//! Conversion service integration tests.
//!
//! Exercises the facade end to end with injected backends:
//! - Valid batches produce one ordered result per request
//! - Rejected batches fail the handle before any job runs
//! - Degraded (simulated) mode when ffmpeg cannot be found
//! - Shutdown semantics

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use audioconv_core::{
    converter::{
        overall_progress, AudioFormat, ConversionRequest, ConversionSettings, ConverterError,
        NoopProgress, OverwritePolicy, SimulationConfig, ToolLocator, ValidationError,
        SIMULATED_SUFFIX,
    },
    processor::WorkerPool,
    service::{select_backend_with, BackendMode, BackendSelection, ConversionService},
    testing::{fixtures, RecordingSink, ScriptedConverter},
    Config,
};

struct Harness {
    service: ConversionService,
    converter: ScriptedConverter,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_workers(2)
    }

    fn with_workers(workers: usize) -> Self {
        let converter = ScriptedConverter::new();
        let backend = Arc::new(WorkerPool::new(converter.clone(), workers));
        Self {
            service: ConversionService::new(BackendSelection::process(backend)),
            converter,
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn inputs(&self, names: &[&str]) -> Vec<PathBuf> {
        fixtures::input_files(self.dir.path(), names).expect("Failed to create inputs")
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.path().join("converted")
    }
}

/// A service in degraded mode: discovery is pointed at empty directories.
async fn degraded_service(dir: &TempDir) -> ConversionService {
    let config = Config {
        simulation: SimulationConfig::instant(4),
        ..Default::default()
    };
    let locator = ToolLocator::new(Some(dir.path().join("no-ffmpeg")), dir.path().join("bin"))
        .without_path_search();
    ConversionService::new(select_backend_with(&locator, &config).await)
}

#[tokio::test]
async fn test_batch_of_three_yields_ordered_results() {
    let harness = Harness::new();
    let inputs = harness.inputs(&["first.wav", "second.wav", "third.wav"]);
    let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();
    // Reverse completion order relative to submission
    harness
        .converter
        .set_delay(&inputs[0], Duration::from_millis(50));

    let results = harness
        .service
        .convert(
            fixtures::requests(&inputs, &harness.output_dir(), &settings),
            Arc::new(NoopProgress),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    for (input, result) in inputs.iter().zip(&results) {
        assert!(result.success);
        assert_eq!(&result.input_path, input);
        let name = result.output_path.as_ref().unwrap().file_name().unwrap();
        assert!(!name.to_string_lossy().contains('('));
    }
    assert_eq!(harness.converter.completion_order().last(), Some(&inputs[0]));
}

#[tokio::test]
async fn test_empty_batch_fails_handle() {
    let harness = Harness::new();

    let err = harness
        .service
        .convert(Vec::new(), Arc::new(NoopProgress))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConverterError::Validation(ValidationError::EmptyBatch)
    ));
    assert_eq!(err.to_string(), "No input files provided.");
}

#[tokio::test]
async fn test_duplicate_input_fails_before_any_job() {
    let harness = Harness::new();
    let inputs = harness.inputs(&["twice.wav", "other.wav"]);
    let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();
    // Same file reached through a different spelling
    let aliased = harness.dir.path().join(".").join("twice.wav");
    let batch = vec![inputs[0].clone(), inputs[1].clone(), aliased];

    let err = harness
        .service
        .convert(
            fixtures::requests(&batch, &harness.output_dir(), &settings),
            Arc::new(NoopProgress),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConverterError::Validation(ValidationError::DuplicateInput { .. })
    ));
    assert!(harness.converter.started_order().is_empty());
}

#[tokio::test]
async fn test_colliding_outputs_fail_before_any_job() {
    let harness = Harness::new();
    let inputs = harness.inputs(&["song.wav", "song.flac"]);
    let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();

    let err = harness
        .service
        .convert(
            fixtures::requests(&inputs, &harness.output_dir(), &settings),
            Arc::new(NoopProgress),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConverterError::Validation(ValidationError::OutputCollision { .. })
    ));
    assert!(err.to_string().contains("song.mp3"));
    assert!(harness.converter.started_order().is_empty());
}

#[tokio::test]
async fn test_missing_input_fails_batch() {
    let harness = Harness::new();
    let mut inputs = harness.inputs(&["here.wav"]);
    inputs.push(harness.dir.path().join("gone.wav"));
    let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();

    let err = harness
        .service
        .convert(
            fixtures::requests(&inputs, &harness.output_dir(), &settings),
            Arc::new(NoopProgress),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConverterError::Validation(ValidationError::InputMissing { .. })
    ));
}

#[tokio::test]
async fn test_partial_failure_keeps_other_results() {
    let harness = Harness::new();
    let inputs = harness.inputs(&["ok.wav", "broken.wav", "fine.wav"]);
    let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();
    harness
        .converter
        .fail_on(&inputs[1], "ffmpeg failed (exit 1)");

    let results = harness
        .service
        .convert(
            fixtures::requests(&inputs, &harness.output_dir(), &settings),
            Arc::new(NoopProgress),
        )
        .await
        .unwrap();

    let outcome: Vec<bool> = results.iter().map(|r| r.success).collect();
    assert_eq!(outcome, vec![true, false, true]);
    assert_eq!(results[1].message, "ffmpeg failed (exit 1)");
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_one() {
    let harness = Harness::with_workers(3);
    harness.converter.set_steps(5);
    let inputs = harness.inputs(&["a.wav", "b.wav", "c.wav"]);
    let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();
    let sink = Arc::new(RecordingSink::new());

    harness
        .service
        .convert(
            fixtures::requests(&inputs, &harness.output_dir(), &settings),
            sink.clone(),
        )
        .await
        .unwrap();

    for name in ["a.wav", "b.wav", "c.wav"] {
        let values = sink.progress_for(name);
        assert!(!values.is_empty());
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(values.last(), Some(&1.0));
    }

    let last_of_batch = sink
        .ticks_for("c.wav")
        .last()
        .map(|t| overall_progress(t.index, t.progress, t.total));
    assert_eq!(last_of_batch, Some(1.0));
}

#[tokio::test]
async fn test_degraded_mode_simulates_batch() {
    let dir = TempDir::new().unwrap();
    let service = degraded_service(&dir).await;
    assert_eq!(service.mode(), BackendMode::Simulated);
    assert!(service.is_degraded());
    assert!(service.take_degraded_notice().is_some());
    assert!(service.take_degraded_notice().is_none());

    let inputs = fixtures::input_files(dir.path(), &["x.wav", "y.wav"]).unwrap();
    let settings = ConversionSettings::builder(AudioFormat::Flac)
        .compression_level(5)
        .build()
        .unwrap();
    let requests: Vec<ConversionRequest> = inputs
        .iter()
        .map(|i| ConversionRequest::new(i, dir.path().join("out"), settings.clone()))
        .collect();
    let sink = Arc::new(RecordingSink::new());

    let results = service.convert(requests, sink.clone()).await.unwrap();

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(result.success);
        let output = result.output_path.as_ref().unwrap();
        assert!(output.to_string_lossy().ends_with(SIMULATED_SUFFIX));
        assert!(!output.exists());
    }
    assert_eq!(sink.ticks_for("x.wav").len(), 4);
    assert_eq!(sink.ticks_for("y.wav").len(), 4);
}

#[tokio::test]
async fn test_shutdown_refuses_later_batches() {
    let harness = Harness::new();
    let inputs = harness.inputs(&["late.wav"]);
    let settings = fixtures::mp3_settings(OverwritePolicy::Rename).unwrap();

    harness.service.shutdown();
    harness.service.shutdown();

    let err = harness
        .service
        .convert(
            fixtures::requests(&inputs, &harness.output_dir(), &settings),
            Arc::new(NoopProgress),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConverterError::ShutDown));
    assert_eq!(harness.converter.release_count(), 1);
}

#[tokio::test]
async fn test_concurrent_shutdown_releases_once() {
    let harness = Harness::new();
    let service = Arc::new(harness.service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.shutdown() })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(service.is_shut_down());
    assert_eq!(harness.converter.release_count(), 1);
}
