use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audioconv_core::{
    load_config, load_config_from_env, overall_progress, validate_config, AudioFormat, Channels,
    Config, ConversionRequest, ConversionService, OverwritePolicy, ProgressSink,
};

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "audioconv.toml";

#[derive(Parser)]
#[command(name = "audioconv")]
#[command(version, about = "Batch-convert audio files with ffmpeg")]
struct Args {
    /// Input files to convert
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory receiving the converted files
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Output format (mp3, m4a, wav, flac)
    #[arg(short, long)]
    format: Option<AudioFormat>,

    /// Bitrate in kbps (lossy formats only)
    #[arg(short, long)]
    bitrate: Option<u32>,

    /// Sample rate in Hz
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,

    /// Downmix to mono
    #[arg(long)]
    mono: bool,

    /// FLAC compression level (0-12)
    #[arg(long)]
    compression_level: Option<u8>,

    /// What to do when the output exists (overwrite, skip, rename)
    #[arg(short = 'p', long)]
    overwrite_policy: Option<OverwritePolicy>,

    /// Configuration file
    #[arg(short, long, env = "AUDIOCONV_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every file converted.
async fn run() -> Result<bool> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = load(&args)?;
    validate_config(&config).context("Configuration validation failed")?;

    let requests = build_requests(&args, &config)?;

    let service = ConversionService::from_config(&config).await;
    if let Some(notice) = service.take_degraded_notice() {
        warn!("{}", notice);
    }

    let sink: Arc<dyn ProgressSink> = Arc::new(ConsoleProgress::default());
    let outcome = service.convert(requests, sink).await;
    service.shutdown();

    let results = outcome.context("Batch failed")?;

    let mut all_ok = true;
    for result in &results {
        match (&result.output_path, result.success) {
            (Some(output), true) => println!(
                "OK    {} -> {}",
                result.input_path.display(),
                output.display()
            ),
            (None, true) => println!("SKIP  {}: {}", result.input_path.display(), result.message),
            (_, false) => {
                all_ok = false;
                println!("FAIL  {}: {}", result.input_path.display(), result.message);
            }
        }
    }

    let failed = results.iter().filter(|r| !r.success).count();
    info!(
        "Done: {} converted or skipped, {} failed",
        results.len() - failed,
        failed
    );
    Ok(all_ok)
}

fn load(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_config_from_env().context("Failed to load configuration from environment"),
    }
}

/// Command-line options layered over `[defaults]`.
fn build_requests(args: &Args, config: &Config) -> Result<Vec<ConversionRequest>> {
    let mut defaults = config.defaults.clone();
    if let Some(format) = args.format {
        if format != defaults.format {
            // Format-specific defaults do not carry over to another format.
            defaults.bitrate_kbps = None;
            defaults.compression_level = None;
        }
        defaults.format = format;
    }
    if args.bitrate.is_some() {
        defaults.bitrate_kbps = args.bitrate;
    }
    if let Some(rate) = args.sample_rate {
        defaults.sample_rate_hz = rate;
    }
    if args.mono {
        defaults.channels = Channels::Mono;
    }
    if args.compression_level.is_some() {
        defaults.compression_level = args.compression_level;
    }
    if let Some(policy) = args.overwrite_policy {
        defaults.overwrite_policy = policy;
    }

    let settings = defaults.to_settings().context("Invalid conversion settings")?;

    Ok(args
        .inputs
        .iter()
        .map(|input| ConversionRequest::new(input, &args.output_dir, settings.clone()))
        .collect())
}

/// Prints overall batch progress in whole percent steps.
#[derive(Default)]
struct ConsoleProgress {
    last_percent: AtomicU64,
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, file_name: &str, progress: f64, index: usize, total: usize) {
        let percent = (overall_progress(index, progress, total) * 100.0).floor() as u64;
        // Parallel jobs interleave; only print when the high-water mark moves.
        if self.last_percent.fetch_max(percent, Ordering::AcqRel) < percent {
            eprintln!("[{:>3}%] {} ({}/{})", percent, file_name, index, total);
        }
    }
}
