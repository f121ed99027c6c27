use serde::{Deserialize, Serialize};

use crate::converter::{
    AudioFormat, Channels, ConversionSettings, ConverterConfig, OverwritePolicy, SettingsError,
    SimulationConfig, DEFAULT_SAMPLE_RATE_HZ,
};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Settings applied to a batch when the caller does not choose its own
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_format")]
    pub format: AudioFormat,
    /// Only meaningful for lossy formats
    #[serde(default)]
    pub bitrate_kbps: Option<u32>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,
    #[serde(default)]
    pub channels: Channels,
    #[serde(default)]
    pub overwrite_policy: OverwritePolicy,
    /// FLAC only (0-12)
    #[serde(default)]
    pub compression_level: Option<u8>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            bitrate_kbps: None,
            sample_rate_hz: default_sample_rate(),
            channels: Channels::default(),
            overwrite_policy: OverwritePolicy::default(),
            compression_level: None,
        }
    }
}

fn default_format() -> AudioFormat {
    AudioFormat::Mp3
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE_HZ
}

impl DefaultsConfig {
    /// Builds validated conversion settings from these defaults.
    pub fn to_settings(&self) -> Result<ConversionSettings, SettingsError> {
        let mut builder = ConversionSettings::builder(self.format)
            .maybe_bitrate_kbps(self.bitrate_kbps)
            .sample_rate_hz(self.sample_rate_hz)
            .channels(self.channels)
            .overwrite_policy(self.overwrite_policy);
        if let Some(level) = self.compression_level {
            builder = builder.compression_level(level);
        }
        builder.build()
    }
}
