//! Stale artifact purge.
//!
//! Deletes files matching each configured pattern directly inside the working
//! directory (never recursively) so binaries and disk images from an earlier
//! run cannot be mistaken for fresh output.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CleanupConfig;
use crate::error::{Error, Result};
use crate::utils::files;

/// A file that matched but could not be deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Per-pattern deletion count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternCleanup {
    pub pattern: String,
    pub deleted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CleanupFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub working_dir: PathBuf,
    pub patterns: Vec<PatternCleanup>,
}

impl CleanupReport {
    pub fn total_deleted(&self) -> usize {
        self.patterns.iter().map(|p| p.deleted).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.patterns.iter().map(|p| p.failures.len()).sum()
    }

    pub fn deleted_for(&self, pattern: &str) -> Option<usize> {
        self.patterns
            .iter()
            .find(|p| p.pattern == pattern)
            .map(|p| p.deleted)
    }
}

/// Delete every file matching the configured patterns in `working_dir`.
///
/// In strict mode the first failed delete aborts with `cleanup.io_error`.
/// Otherwise the failure is recorded on its pattern and cleanup continues.
pub fn purge(working_dir: &Path, config: &CleanupConfig) -> Result<CleanupReport> {
    let mut patterns = Vec::with_capacity(config.patterns.len());

    for pattern in &config.patterns {
        let mut entry = PatternCleanup {
            pattern: pattern.clone(),
            deleted: 0,
            failures: Vec::new(),
        };

        for path in files::glob_files(working_dir, pattern)? {
            match fs::remove_file(&path) {
                Ok(()) => entry.deleted += 1,
                Err(e) if config.strict => {
                    return Err(Error::cleanup_io(path.display().to_string(), e.to_string()));
                }
                Err(e) => {
                    log_status!("clean", "Could not delete {}: {}", path.display(), e);
                    entry.failures.push(CleanupFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        log_status!("clean", "Deleted {} file(s) matching {}", entry.deleted, pattern);
        patterns.push(entry);
    }

    Ok(CleanupReport {
        working_dir: working_dir.to_path_buf(),
        patterns,
    })
}
