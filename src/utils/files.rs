//! Glob matching rooted at a base directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Expand `pattern` relative to `base` and return every match that is not a
/// directory, in glob order (sorted by path).
///
/// The base directory is escaped, so brackets or asterisks in its name are
/// matched literally. Unreadable entries are skipped. Symlinks are not
/// followed: a link is returned as itself even when its target is missing.
pub fn glob_files(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped_base = glob::Pattern::escape(&base.to_string_lossy());
    let full_pattern = format!("{}/{}", escaped_base.trim_end_matches('/'), pattern);

    let entries = glob::glob(&full_pattern).map_err(|e| {
        Error::config_invalid_value(
            "pattern",
            Some(pattern.to_string()),
            format!("Invalid glob pattern: {}", e),
        )
    })?;

    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|p| !is_real_dir(p))
        .collect())
}

fn is_real_dir(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.is_dir())
        .unwrap_or(true)
}
