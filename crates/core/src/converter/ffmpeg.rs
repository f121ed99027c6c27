//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::error::JobError;
use super::locate::{ToolLocator, ToolPaths};
use super::resolver::{resolve_output, ResolvedOutput};
use super::traits::Converter;
use super::types::{ConversionRequest, ConversionResult, ConversionSettings, JobProgress};

/// Diagnostic lines kept for failure messages.
const MAX_DIAGNOSTIC_LINES: usize = 5;

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
    tools: ToolPaths,
    shutdown: watch::Sender<bool>,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter using already located tools.
    pub fn new(config: ConverterConfig, tools: ToolPaths) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            tools,
            shutdown,
        }
    }

    /// Locates ffmpeg/ffprobe and creates a converter, if both are available.
    pub async fn locate(config: ConverterConfig) -> Option<Self> {
        let tools = ToolLocator::from_config(&config).locate().await?;
        Some(Self::new(config, tools))
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Builds ffmpeg arguments for one job.
    fn build_args(
        &self,
        input_path: &Path,
        output_path: &Path,
        settings: &ConversionSettings,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // The output path was already chosen under the overwrite policy
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(),
        ];

        // Channels
        args.extend(["-ac".to_string(), settings.channels().count().to_string()]);

        // Sample rate
        args.extend(["-ar".to_string(), settings.sample_rate_hz().to_string()]);

        // Audio codec
        args.extend([
            "-c:a".to_string(),
            settings.format().ffmpeg_codec().to_string(),
        ]);

        // Bitrate (for lossy formats)
        if let Some(bitrate) = settings.effective_bitrate_kbps() {
            args.extend(["-b:a".to_string(), format!("{}k", bitrate)]);
        }

        // Compression level (FLAC)
        if let Some(level) = settings.compression_level() {
            args.extend(["-compression_level".to_string(), level.to_string()]);
        }

        // Log level
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        // Progress output for parsing
        args.extend([
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Parses ffprobe JSON output into a duration in seconds.
    fn parse_probe_output(output: &str) -> Option<f64> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        let parsed: ProbeOutput = serde_json::from_str(output).ok()?;
        parsed
            .format
            .duration
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Probes the input's duration. `None` when unknown.
    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.tools.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Self::parse_probe_output(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!(
                    "ffprobe failed for {:?} with {:?}; progress disabled",
                    path,
                    output.status.code()
                );
                None
            }
            Err(e) => {
                debug!("Failed to run ffprobe for {:?}: {}", path, e);
                None
            }
        }
    }

    /// Runs ffmpeg for one job until it exits.
    async fn run_encoder(
        &self,
        request: &ConversionRequest,
        output_path: &Path,
        progress: &mut JobProgress,
    ) -> Result<(), JobError> {
        // Ensure output directory exists
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| JobError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let duration_secs = self.probe_duration(request.input_path()).await;
        let args = self.build_args(request.input_path(), output_path, request.settings());
        debug!("Running {:?} {}", self.tools.ffmpeg, args.join(" "));

        let mut child = Command::new(&self.tools.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| JobError::Launch {
                path: self.tools.ffmpeg.clone(),
                source,
            })?;

        // Nothing useful is written to stdout; drain it so the encoder never blocks.
        if let Some(mut stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut stdout, &mut tokio::io::sink()).await;
            });
        }

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| JobError::Io(std::io::Error::other("stderr was not captured")))?;

        let pumped = match self.config.job_timeout() {
            Some(limit) => {
                match timeout(
                    limit,
                    self.pump_diagnostics(&mut child, stderr, duration_secs, progress),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(JobError::Timeout {
                        timeout_secs: limit.as_secs(),
                    }),
                }
            }
            None => {
                self.pump_diagnostics(&mut child, stderr, duration_secs, progress)
                    .await
            }
        };

        let (status, diagnostics) = match pumped {
            Ok(done) => done,
            Err(e) => {
                // Kill the process on timeout or shutdown
                let _ = child.kill().await;
                return Err(e);
            }
        };

        if !status.success() {
            return Err(JobError::exit_status(
                status,
                (!diagnostics.is_empty()).then_some(diagnostics),
            ));
        }

        Ok(())
    }

    /// Reads the diagnostic stream, forwarding progress, until the process exits.
    async fn pump_diagnostics(
        &self,
        child: &mut Child,
        stderr: ChildStderr,
        duration_secs: Option<f64>,
        progress: &mut JobProgress,
    ) -> Result<(ExitStatus, String), JobError> {
        let mut reader = BufReader::new(stderr).lines();
        let parser = ProgressParser::new();
        let mut diagnostics: VecDeque<String> = VecDeque::with_capacity(MAX_DIAGNOSTIC_LINES);

        let cancelled = wait_for_shutdown(self.shutdown.subscribe());
        tokio::pin!(cancelled);

        loop {
            let line = tokio::select! {
                line = reader.next_line() => line?,
                _ = &mut cancelled => return Err(JobError::Cancelled),
            };
            let Some(line) = line else {
                break;
            };

            if let Some(elapsed) = parser.elapsed_seconds(&line) {
                if let Some(total) = duration_secs {
                    progress.report((elapsed / total).min(1.0));
                }
            } else if parser.is_diagnostic(&line) {
                if diagnostics.len() == MAX_DIAGNOSTIC_LINES {
                    diagnostics.pop_front();
                }
                diagnostics.push_back(line.trim().to_string());
            }
        }

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = &mut cancelled => return Err(JobError::Cancelled),
        };
        let diagnostics = diagnostics.into_iter().collect::<Vec<_>>().join("; ");
        Ok((status, diagnostics))
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Completes once the shutdown flag is raised.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Extracts elapsed-time tokens from ffmpeg's diagnostic stream.
struct ProgressParser {
    time_regex: Option<Regex>,
    key_regex: Option<Regex>,
}

impl ProgressParser {
    fn new() -> Self {
        Self {
            // Matches both `time=` stats and `out_time=` progress keys
            time_regex: Regex::new(r"time=(\d+:\d{2}:\d{2}(?:\.\d+)?)").ok(),
            key_regex: Regex::new(r"^[a-z_0-9]+=\S*$").ok(),
        }
    }

    fn elapsed_seconds(&self, line: &str) -> Option<f64> {
        let re = self.time_regex.as_ref()?;
        let caps = re.captures(line)?;
        parse_timecode(caps.get(1)?.as_str())
    }

    /// Whether a line is human-readable output rather than a progress key.
    fn is_diagnostic(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        match self.key_regex {
            Some(ref re) => !re.is_match(line),
            None => true,
        }
    }
}

/// Parses an `HH:MM:SS.ff` timecode into seconds.
pub fn parse_timecode(token: &str) -> Option<f64> {
    let mut parts = token.trim().split(':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(
        &self,
        request: &ConversionRequest,
        progress: &mut JobProgress,
    ) -> ConversionResult {
        let input = request.input_path();

        if self.is_shut_down() {
            return ConversionResult::failed(input, None, JobError::Cancelled.message());
        }

        let settings = request.settings();
        let resolved = match resolve_output(
            input,
            request.output_dir(),
            settings.format().extension(),
            settings.overwrite_policy(),
        ) {
            Ok(resolved) => resolved,
            Err(e) => {
                let err = JobError::ResolveFailed(e);
                warn!("Job {:?} failed: {}", input, err);
                return ConversionResult::failed(input, None, err.message());
            }
        };

        let output_path: PathBuf = match resolved {
            ResolvedOutput::Path(path) => path,
            ResolvedOutput::Skip => {
                info!("Skipping {:?}: output already exists", input);
                return ConversionResult::skipped(input);
            }
        };

        match self.run_encoder(request, &output_path, progress).await {
            Ok(()) => {
                progress.finish();
                debug!("Converted {:?} -> {:?}", input, output_path);
                ConversionResult::succeeded(input, output_path, "OK")
            }
            Err(e) => {
                warn!("Job {:?} failed: {}", input, e);
                ConversionResult::failed(input, Some(output_path), e.message())
            }
        }
    }

    fn release(&self) {
        self.shutdown.send_replace(true);
    }
}
