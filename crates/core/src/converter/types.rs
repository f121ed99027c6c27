//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::error::SettingsError;

/// Bitrate used for lossy formats when the settings leave it unset.
pub const DEFAULT_BITRATE_KBPS: u32 = 192;

/// Sample rate used when none is chosen explicitly.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Highest compression level accepted by the FLAC encoder.
pub const MAX_FLAC_COMPRESSION_LEVEL: u8 = 12;

/// Output audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    Mp3,
    /// AAC in an MPEG-4 container
    M4a,
    /// WAVE (uncompressed PCM)
    Wav,
    /// Free Lossless Audio Codec
    Flac,
}

impl AudioFormat {
    /// All supported output formats.
    pub const ALL: [AudioFormat; 4] = [Self::Mp3, Self::M4a, Self::Wav, Self::Flac];

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }

    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::M4a => "aac",
            Self::Wav => "pcm_s16le",
            Self::Flac => "flac",
        }
    }

    /// Whether this format is lossless.
    pub fn is_lossless(&self) -> bool {
        match self {
            Self::Wav | Self::Flac => true,
            Self::Mp3 | Self::M4a => false,
        }
    }

    /// Whether this format accepts a compression level.
    pub fn supports_compression_level(&self) -> bool {
        matches!(self, Self::Flac)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "m4a" | "aac" => Ok(Self::M4a),
            "wav" => Ok(Self::Wav),
            "flac" => Ok(Self::Flac),
            other => Err(SettingsError::UnknownFormat(other.to_string())),
        }
    }
}

/// Output channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channels {
    Mono,
    #[default]
    Stereo,
}

impl Channels {
    /// Number of audio channels.
    pub fn count(&self) -> u8 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// What to do when the computed output path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Replace the existing file.
    Overwrite,
    /// Leave the existing file alone and skip the job.
    Skip,
    /// Pick the first free `name(N).ext`.
    #[default]
    Rename,
}

impl FromStr for OverwritePolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "rename" => Ok(Self::Rename),
            other => Err(SettingsError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Desired output characteristics of one conversion job.
///
/// Built through [`ConversionSettings::builder`], which rejects combinations
/// that make no sense for the chosen format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSettings {
    format: AudioFormat,
    bitrate_kbps: Option<u32>,
    sample_rate_hz: u32,
    channels: Channels,
    overwrite_policy: OverwritePolicy,
    compression_level: Option<u8>,
}

impl ConversionSettings {
    /// Starts building settings for the given format.
    pub fn builder(format: AudioFormat) -> ConversionSettingsBuilder {
        ConversionSettingsBuilder {
            format,
            bitrate_kbps: None,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            channels: Channels::default(),
            overwrite_policy: OverwritePolicy::default(),
            compression_level: None,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Requested bitrate; always `None` for lossless formats.
    pub fn bitrate_kbps(&self) -> Option<u32> {
        self.bitrate_kbps
    }

    /// Bitrate to hand the encoder, if the format takes one.
    pub fn effective_bitrate_kbps(&self) -> Option<u32> {
        if self.format.is_lossless() {
            None
        } else {
            Some(self.bitrate_kbps.unwrap_or(DEFAULT_BITRATE_KBPS))
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        self.overwrite_policy
    }

    /// FLAC compression level, if set.
    pub fn compression_level(&self) -> Option<u8> {
        self.compression_level
    }
}

/// Builder for [`ConversionSettings`].
#[derive(Debug, Clone)]
pub struct ConversionSettingsBuilder {
    format: AudioFormat,
    bitrate_kbps: Option<u32>,
    sample_rate_hz: u32,
    channels: Channels,
    overwrite_policy: OverwritePolicy,
    compression_level: Option<u8>,
}

impl ConversionSettingsBuilder {
    /// Sets the bitrate in kbps (lossy formats only).
    pub fn bitrate_kbps(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = Some(kbps);
        self
    }

    /// Sets the bitrate from an optional value.
    pub fn maybe_bitrate_kbps(mut self, kbps: Option<u32>) -> Self {
        self.bitrate_kbps = kbps;
        self
    }

    pub fn sample_rate_hz(mut self, hz: u32) -> Self {
        self.sample_rate_hz = hz;
        self
    }

    pub fn channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    pub fn overwrite_policy(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite_policy = policy;
        self
    }

    /// Sets the compression level (FLAC only, 0-12).
    pub fn compression_level(mut self, level: u8) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Validates and builds the settings.
    pub fn build(self) -> Result<ConversionSettings, SettingsError> {
        if let Some(kbps) = self.bitrate_kbps {
            if self.format.is_lossless() {
                return Err(SettingsError::BitrateNotApplicable {
                    format: self.format,
                });
            }
            if kbps == 0 {
                return Err(SettingsError::InvalidBitrate);
            }
        }

        if self.sample_rate_hz == 0 {
            return Err(SettingsError::InvalidSampleRate);
        }

        if let Some(level) = self.compression_level {
            if !self.format.supports_compression_level() {
                return Err(SettingsError::CompressionNotApplicable {
                    format: self.format,
                });
            }
            if level > MAX_FLAC_COMPRESSION_LEVEL {
                return Err(SettingsError::CompressionOutOfRange { level });
            }
        }

        Ok(ConversionSettings {
            format: self.format,
            bitrate_kbps: self.bitrate_kbps,
            sample_rate_hz: self.sample_rate_hz,
            channels: self.channels,
            overwrite_policy: self.overwrite_policy,
            compression_level: self.compression_level,
        })
    }
}

/// One file to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    input_path: PathBuf,
    output_dir: PathBuf,
    settings: ConversionSettings,
}

impl ConversionRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        settings: ConversionSettings,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            settings,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// File name shown to progress sinks.
    pub fn display_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.input_path.to_string_lossy().to_string())
    }
}

/// Outcome of one conversion job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// The request's input path.
    pub input_path: PathBuf,
    /// Where the output went; `None` if skipped or the path was never resolved.
    pub output_path: Option<PathBuf>,
    /// Whether the job succeeded (a skip counts as success).
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl ConversionResult {
    pub fn succeeded(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: Some(output_path.into()),
            success: true,
            message: message.into(),
        }
    }

    /// A successful result for a job whose output already existed.
    pub fn skipped(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            success: true,
            message: "Skipped (exists)".to_string(),
        }
    }

    pub fn failed(
        input_path: impl Into<PathBuf>,
        output_path: Option<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path,
            success: false,
            message: message.into(),
        }
    }

    /// Whether this job was skipped because its output already existed.
    pub fn is_skipped(&self) -> bool {
        self.success && self.output_path.is_none()
    }
}

/// Receives per-file progress from worker tasks.
///
/// Called concurrently from several workers; implementations that feed a
/// single-threaded consumer must hop to it themselves.
pub trait ProgressSink: Send + Sync {
    /// `progress` is in `[0.0, 1.0]`, `index` is 1-based.
    fn on_progress(&self, file_name: &str, progress: f64, index: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, f64, usize, usize) + Send + Sync,
{
    fn on_progress(&self, file_name: &str, progress: f64, index: usize, total: usize) {
        self(file_name, progress, index, total)
    }
}

/// A sink that drops every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&self, _file_name: &str, _progress: f64, _index: usize, _total: usize) {}
}

/// Batch-wide progress with every file weighted equally.
pub fn overall_progress(index: usize, progress: f64, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let done = index.saturating_sub(1) as f64 + progress.clamp(0.0, 1.0);
    (done / total as f64).clamp(0.0, 1.0)
}

/// Progress reporter owned by a single job.
///
/// Keeps the reported sequence inside `[0.0, 1.0]` and non-decreasing.
pub struct JobProgress {
    file_name: String,
    index: usize,
    total: usize,
    sink: Arc<dyn ProgressSink>,
    last: Option<f64>,
    ticks: usize,
}

impl JobProgress {
    /// `index` is the 1-based position of the job in its batch.
    pub fn new(
        file_name: impl Into<String>,
        index: usize,
        total: usize,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            index,
            total,
            sink,
            last: None,
            ticks: 0,
        }
    }

    /// Reports a fraction; out-of-order values are dropped.
    pub fn report(&mut self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if matches!(self.last, Some(last) if fraction < last) {
            return;
        }
        self.last = Some(fraction);
        self.ticks += 1;
        self.sink
            .on_progress(&self.file_name, fraction, self.index, self.total);
    }

    /// Reports completion.
    pub fn finish(&mut self) {
        self.report(1.0);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of ticks forwarded to the sink so far.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

impl fmt::Debug for JobProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobProgress")
            .field("file_name", &self.file_name)
            .field("index", &self.index)
            .field("total", &self.total)
            .field("last", &self.last)
            .finish()
    }
}
