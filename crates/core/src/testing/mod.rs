//! Testing utilities for batch conversion.
//!
//! Provides a scriptable [`Converter`](crate::converter::Converter) and a
//! progress sink that records every tick, so orchestration can be exercised
//! without an encoder.
//!
//! # Example
//!
//! ```rust,ignore
//! use audioconv_core::testing::{RecordingSink, ScriptedConverter};
//!
//! let converter = ScriptedConverter::new();
//! converter.fail_on("/music/broken.wav", "ffmpeg failed (exit 1)");
//!
//! let sink = Arc::new(RecordingSink::new());
//! let pool = WorkerPool::new(converter.clone(), 2);
//! let results = pool.run_batch(requests, sink.clone()).await?;
//! ```

mod recording_sink;
mod scripted_converter;

pub use recording_sink::{ProgressTick, RecordingSink};
pub use scripted_converter::ScriptedConverter;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::converter::{
        AudioFormat, ConversionRequest, ConversionSettings, OverwritePolicy, SettingsError,
    };

    /// MP3 settings at 192 kbps, stereo, 44.1 kHz.
    pub fn mp3_settings(policy: OverwritePolicy) -> Result<ConversionSettings, SettingsError> {
        ConversionSettings::builder(AudioFormat::Mp3)
            .bitrate_kbps(192)
            .sample_rate_hz(44_100)
            .overwrite_policy(policy)
            .build()
    }

    /// Creates small placeholder input files and returns their paths.
    pub fn input_files(dir: &Path, names: &[&str]) -> std::io::Result<Vec<PathBuf>> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, b"RIFF")?;
                Ok(path)
            })
            .collect()
    }

    /// One request per input, all sharing the same output directory and settings.
    pub fn requests(
        inputs: &[PathBuf],
        output_dir: &Path,
        settings: &ConversionSettings,
    ) -> Vec<ConversionRequest> {
        inputs
            .iter()
            .map(|input| ConversionRequest::new(input, output_dir, settings.clone()))
            .collect()
    }
}
