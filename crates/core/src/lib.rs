pub mod config;
pub mod converter;
pub mod processor;
pub mod service;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, DefaultsConfig,
};
pub use converter::{
    overall_progress, AudioFormat, Channels, ConversionBackend, ConversionRequest,
    ConversionResult, ConversionSettings, ConverterError, OverwritePolicy, ProgressSink,
    SettingsError, ValidationError,
};
pub use processor::{PoolStatus, WorkerPool};
pub use service::{BackendMode, BatchHandle, ConversionService};
