//! Executable discovery across all utility output trees.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::files;

/// Executable file name → absolute path.
///
/// Built once by [`locate`] and read-only afterwards. When two output trees
/// contain the same file name, the entry discovered last wins. Discovery
/// visits paths in sorted order, so "last" is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BinaryIndex {
    entries: BTreeMap<String, PathBuf>,
}

impl BinaryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`, replacing and returning any earlier path.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.entries.insert(name.into(), path.into())
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and display paths, for diagnostics and error details.
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(name, path)| (name.clone(), path.display().to_string()))
            .collect()
    }
}

/// Scan `<utilities_root>/*/bin/**/<executable_pattern>` and index every
/// non-directory match found. Executables unrelated to the configured utilities are
/// indexed too. A missing root or zero matches gives an empty index.
pub fn locate(utilities_root: &Path, executable_pattern: &str) -> Result<BinaryIndex> {
    let pattern = format!("*/bin/**/{}", executable_pattern);
    let mut index = BinaryIndex::new();

    for path in files::glob_files(utilities_root, &pattern)? {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        let path = std::path::absolute(&path).unwrap_or(path);

        if let Some(previous) = index.insert(name.clone(), path.clone()) {
            log_status!(
                "locate",
                "{} found at {}, replacing {}",
                name,
                path.display(),
                previous.display()
            );
        }
    }

    log_status!(
        "locate",
        "Indexed {} executable(s) under {}",
        index.len(),
        utilities_root.display()
    );

    Ok(index)
}
