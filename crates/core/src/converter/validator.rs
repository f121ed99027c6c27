//! Pre-flight validation of a conversion batch.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use super::error::ValidationError;
use super::resolver::candidate_path;
use super::types::ConversionRequest;

/// Validates a batch before any job starts.
///
/// Checks run in a fixed order and stop at the first violation:
/// 1. the batch is non-empty
/// 2. every input exists and can be opened for reading
/// 3. every output directory that already exists is a writable directory
/// 4. no two requests share a canonical input path
/// 5. no two requests would write the same output file
pub fn validate_batch(requests: &[ConversionRequest]) -> Result<(), ValidationError> {
    if requests.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    for request in requests {
        check_input(request)?;
    }

    for request in requests {
        check_output_dir(request)?;
    }

    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        let canonical = fs::canonicalize(request.input_path()).map_err(|source| {
            ValidationError::InputUnreadable {
                path: request.input_path().to_path_buf(),
                source,
            }
        })?;
        if !seen.insert(canonical) {
            return Err(ValidationError::DuplicateInput {
                path: request.input_path().to_path_buf(),
            });
        }
    }

    // Jobs resolve their outputs concurrently, so equal candidates would race.
    let mut outputs: HashMap<PathBuf, &Path> = HashMap::with_capacity(requests.len());
    for request in requests {
        let output = candidate_path(
            request.input_path(),
            &normalized_dir(request.output_dir()),
            request.settings().format().extension(),
        );
        if let Some(first) = outputs.insert(output.clone(), request.input_path()) {
            return Err(ValidationError::OutputCollision {
                output,
                first: first.to_path_buf(),
                second: request.input_path().to_path_buf(),
            });
        }
    }

    Ok(())
}

/// Canonical form of an existing directory; the path as given otherwise.
fn normalized_dir(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

fn check_input(request: &ConversionRequest) -> Result<(), ValidationError> {
    let path = request.input_path();
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ValidationError::InputMissing {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ValidationError::InputUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if !metadata.is_file() {
        return Err(ValidationError::InputUnreadable {
            path: path.to_path_buf(),
            source: std::io::Error::other("not a regular file"),
        });
    }

    File::open(path).map_err(|source| ValidationError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn check_output_dir(request: &ConversionRequest) -> Result<(), ValidationError> {
    let dir = request.output_dir();
    let metadata = match fs::metadata(dir) {
        Ok(m) => m,
        // Created later by the backend.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(_) => {
            return Err(ValidationError::OutputNotWritable {
                path: dir.to_path_buf(),
            });
        }
    };

    if !metadata.is_dir() {
        return Err(ValidationError::OutputNotDirectory {
            path: dir.to_path_buf(),
        });
    }

    // Mode bits say nothing about who owns the directory; creating a file does.
    if tempfile::tempfile_in(dir).is_err() {
        return Err(ValidationError::OutputNotWritable {
            path: dir.to_path_buf(),
        });
    }

    Ok(())
}
