//! Output path resolution under an overwrite policy.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::types::OverwritePolicy;

/// Where a job should write its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOutput {
    /// Write to this path.
    Path(PathBuf),
    /// The output already exists and the policy says to leave it.
    Skip,
}

impl ResolvedOutput {
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Path(path) => Some(path),
            Self::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Returns the input's base name (extension stripped).
fn base_name(input: &Path) -> OsString {
    input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("output"))
}

fn with_name(output_dir: &Path, base: &OsString, suffix: &str, extension: &str) -> PathBuf {
    let mut name = base.clone();
    name.push(suffix);
    name.push(".");
    name.push(extension.to_ascii_lowercase());
    output_dir.join(name)
}

/// The unconditional candidate: `<output_dir>/<base>.<extension>`.
pub fn candidate_path(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    with_name(output_dir, &base_name(input), "", extension)
}

/// Resolves the output path for `input` according to `policy`.
///
/// Only existence checks touch the filesystem. An error means an existence
/// check itself failed.
pub fn resolve_output(
    input: &Path,
    output_dir: &Path,
    extension: &str,
    policy: OverwritePolicy,
) -> std::io::Result<ResolvedOutput> {
    let base = base_name(input);
    let candidate = with_name(output_dir, &base, "", extension);

    match policy {
        OverwritePolicy::Overwrite => Ok(ResolvedOutput::Path(candidate)),
        OverwritePolicy::Skip => {
            if candidate.try_exists()? {
                Ok(ResolvedOutput::Skip)
            } else {
                Ok(ResolvedOutput::Path(candidate))
            }
        }
        OverwritePolicy::Rename => {
            if !candidate.try_exists()? {
                return Ok(ResolvedOutput::Path(candidate));
            }
            let mut n: u64 = 1;
            loop {
                let next = with_name(output_dir, &base, &format!("({})", n), extension);
                if !next.try_exists()? {
                    return Ok(ResolvedOutput::Path(next));
                }
                n += 1;
            }
        }
    }
}
