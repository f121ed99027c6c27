//! Converter module for transcoding audio files.
//!
//! This module provides the per-job [`Converter`] trait, the batch-level
//! [`ConversionBackend`] trait and two converters: [`FfmpegConverter`], which
//! shells out to ffmpeg/ffprobe, and [`SimulatedConverter`], which fabricates
//! timed progress when no encoder is installed.
//!
//! # Features
//!
//! - Closed format set (MP3, M4A, WAV, FLAC) with validated settings
//! - Output path resolution under an overwrite policy
//! - Pre-flight batch validation
//! - Per-file progress reporting
//! - Encoder discovery (override dir, local install, PATH)
//!
//! # Example
//!
//! ```ignore
//! use audioconv_core::converter::{AudioFormat, ConversionRequest, ConversionSettings, Converter};
//!
//! let settings = ConversionSettings::builder(AudioFormat::Mp3)
//!     .bitrate_kbps(192)
//!     .build()?;
//! let request = ConversionRequest::new("/music/song.wav", "/music/out", settings);
//!
//! let converter = FfmpegConverter::locate(ConverterConfig::default())
//!     .await
//!     .expect("ffmpeg not installed");
//! let mut progress = JobProgress::new(request.display_name(), 1, 1, Arc::new(NoopProgress));
//! let result = converter.convert(&request, &mut progress).await;
//! println!("{}: {}", result.input_path.display(), result.message);
//! ```

mod config;
mod error;
mod ffmpeg;
mod locate;
mod resolver;
mod simulated;
mod traits;
mod types;
mod validator;

pub use config::{default_worker_count, ConverterConfig, SimulationConfig};
pub use error::{ConverterError, JobError, SettingsError, ValidationError};
pub use ffmpeg::{parse_timecode, FfmpegConverter};
pub use locate::{ToolLocator, ToolPaths, FFMPEG_HOME_ENV};
pub use resolver::{candidate_path, resolve_output, ResolvedOutput};
pub use simulated::{SimulatedConverter, SIMULATED_SUFFIX};
pub use traits::{ConversionBackend, Converter};
pub use types::{
    overall_progress, AudioFormat, Channels, ConversionRequest, ConversionResult,
    ConversionSettings, ConversionSettingsBuilder, JobProgress, NoopProgress, OverwritePolicy,
    ProgressSink, DEFAULT_BITRATE_KBPS, DEFAULT_SAMPLE_RATE_HZ, MAX_FLAC_COMPRESSION_LEVEL,
};
pub use validator::validate_batch;
