use super::{types::Config, ConfigError};

/// Log levels ffmpeg accepts for `-loglevel`.
const FFMPEG_LOG_LEVELS: &[&str] = &[
    "quiet", "panic", "fatal", "error", "warning", "info", "verbose", "debug", "trace",
];

/// Validate configuration
/// Currently validates:
/// - Simulation emits at least one tick
/// - Parallelism and timeout are not 0 when set
/// - ffmpeg log level is one ffmpeg knows
/// - Default settings build
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.simulation.steps == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.steps cannot be 0".to_string(),
        ));
    }

    if config.converter.max_parallel_conversions == Some(0) {
        return Err(ConfigError::ValidationError(
            "converter.max_parallel_conversions cannot be 0".to_string(),
        ));
    }

    if config.converter.job_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "converter.job_timeout_secs cannot be 0".to_string(),
        ));
    }

    if !FFMPEG_LOG_LEVELS.contains(&config.converter.ffmpeg_log_level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "converter.ffmpeg_log_level '{}' is not a valid ffmpeg log level",
            config.converter.ffmpeg_log_level
        )));
    }

    config
        .defaults
        .to_settings()
        .map_err(|e| ConfigError::ValidationError(format!("defaults: {}", e)))?;

    Ok(())
}
