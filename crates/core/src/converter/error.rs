//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::AudioFormat;

/// Invalid combination of conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Bitrate given for a lossless format.
    #[error("Bitrate is not applicable to {format}")]
    BitrateNotApplicable { format: AudioFormat },

    #[error("Bitrate must be greater than zero")]
    InvalidBitrate,

    #[error("Sample rate must be greater than zero")]
    InvalidSampleRate,

    /// Compression level given for a format that has none.
    #[error("Compression level is not applicable to {format}")]
    CompressionNotApplicable { format: AudioFormat },

    #[error("Compression level {level} is out of range (0-12)")]
    CompressionOutOfRange { level: u8 },

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    #[error("Unknown overwrite policy: {0}")]
    UnknownPolicy(String),
}

/// A batch rejected before any job started.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No input files provided.")]
    EmptyBatch,

    #[error("Input file missing: {path}")]
    InputMissing { path: PathBuf },

    #[error("Cannot read: {path}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output path is not a directory: {path}")]
    OutputNotDirectory { path: PathBuf },

    #[error("Cannot write to output directory: {path}")]
    OutputNotWritable { path: PathBuf },

    #[error("Duplicate file detected: {path}")]
    DuplicateInput { path: PathBuf },

    /// Two inputs would be converted to the same output file.
    #[error("Output collision: {first} and {second} both convert to {output}")]
    OutputCollision {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A single job's failure. Captured into its result, never propagated.
#[derive(Debug, Error)]
pub enum JobError {
    /// The encoder could not be started.
    #[error("Failed to launch {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited unsuccessfully.
    #[error("ffmpeg failed ({status})")]
    ExitStatus {
        status: String,
        stderr: Option<String>,
    },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not decide on an output path.
    #[error("Failed to resolve output path: {0}")]
    ResolveFailed(#[source] std::io::Error),

    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The backend was released while the job was pending or running.
    #[error("Conversion cancelled: backend shut down")]
    Cancelled,

    /// I/O error while talking to the encoder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Creates an exit status error from the process status and captured diagnostics.
    pub fn exit_status(status: std::process::ExitStatus, stderr: Option<String>) -> Self {
        let status = match status.code() {
            Some(code) => format!("exit {}", code),
            None => "terminated by signal".to_string(),
        };
        Self::ExitStatus { status, stderr }
    }

    /// Full message for a result, including captured diagnostics.
    pub fn message(&self) -> String {
        match self {
            Self::ExitStatus {
                stderr: Some(stderr),
                ..
            } if !stderr.is_empty() => format!("{}: {}", self, stderr),
            _ => self.to_string(),
        }
    }
}

/// Errors surfaced by the orchestrator and the conversion service.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The batch failed pre-flight validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend was released and accepts no more work.
    #[error("Conversion backend has been shut down")]
    ShutDown,

    /// The batch task ended without producing results.
    #[error("Conversion batch aborted: {reason}")]
    Aborted { reason: String },
}

impl ConverterError {
    /// Creates a new aborted error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Whether the batch was rejected by validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
