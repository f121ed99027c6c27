//! Discovery of the ffmpeg/ffprobe executables.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::config::ConverterConfig;

/// Environment variable naming an ffmpeg install directory.
pub const FFMPEG_HOME_ENV: &str = "FFMPEG_HOME";

/// Located encoder and prober executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Searches for the external tools.
///
/// Order: override directory (`<home>/bin`, then `<home>`), the local
/// install directory, then whatever `PATH` resolves. Every candidate must
/// answer `-version` with exit code 0.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    ffmpeg_home: Option<PathBuf>,
    local_dir: PathBuf,
    search_path: bool,
}

impl ToolLocator {
    pub fn new(ffmpeg_home: Option<PathBuf>, local_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_home,
            local_dir: local_dir.into(),
            search_path: true,
        }
    }

    /// Builds a locator from configuration, falling back to `FFMPEG_HOME`.
    pub fn from_config(config: &ConverterConfig) -> Self {
        let home = config
            .ffmpeg_home
            .clone()
            .or_else(|| std::env::var_os(FFMPEG_HOME_ENV).map(PathBuf::from));
        Self::new(home, config.local_tools_dir.clone())
    }

    /// Disables the `PATH` search.
    pub fn without_path_search(mut self) -> Self {
        self.search_path = false;
        self
    }

    /// Finds both tools, or `None` if either is missing.
    pub async fn locate(&self) -> Option<ToolPaths> {
        let ffmpeg = self.find("ffmpeg").await?;
        let ffprobe = self.find("ffprobe").await?;
        Some(ToolPaths { ffmpeg, ffprobe })
    }

    async fn find(&self, base: &str) -> Option<PathBuf> {
        let exe = executable_name(base);

        if let Some(ref home) = self.ffmpeg_home {
            for candidate in [home.join("bin").join(&exe), home.join(&exe)] {
                if is_executable(&candidate) && responds_to_version(&candidate).await {
                    debug!("Found {} in override directory: {:?}", base, candidate);
                    return Some(candidate);
                }
            }
        }

        let local = self.local_dir.join(&exe);
        if is_executable(&local) {
            let local = std::path::absolute(&local).unwrap_or(local);
            if responds_to_version(&local).await {
                debug!("Found {} in local install: {:?}", base, local);
                return Some(local);
            }
        }

        if self.search_path && responds_to_version(Path::new(&exe)).await {
            debug!("Found {} on PATH", base);
            return Some(PathBuf::from(exe));
        }

        None
    }
}

fn executable_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

async fn responds_to_version(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
