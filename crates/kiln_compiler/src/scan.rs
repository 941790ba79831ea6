//! Directory scans against the registry.
//!
//! A scan walks a directory under the source root and sorts every file into
//! new, modified, unchanged or deleted by comparing it with the set of
//! source files already registered and a reference timestamp.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::SystemTime;

use tracing::warn;

/// Result of scanning a directory against the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Files on disk that are not registered.
    pub new_files: Vec<String>,

    /// Registered files modified after the reference timestamp.
    pub modified_files: Vec<String>,

    /// Registered files under the directory that no longer exist.
    pub deleted_files: Vec<String>,

    /// Registered files not modified since the reference timestamp.
    pub unchanged_files: Vec<String>,
}

impl ScanResult {
    /// Returns `true` if there are no new, modified or deleted files.
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Returns the number of files that need registering or recompiling.
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }

    /// Iterates over new and modified files.
    pub fn dirty(&self) -> impl Iterator<Item = &str> {
        self.new_files
            .iter()
            .chain(self.modified_files.iter())
            .map(String::as_str)
    }
}

/// Scans `dir` (relative to `source_root`, `""` for the root itself).
///
/// Entries whose name starts with `.` are skipped, as is `exclude` (the
/// cache directory when it lives inside the source root). `known` holds the
/// registered source files. Unreadable directories are logged and skipped.
pub fn scan_dir(
    source_root: &Path,
    dir: &str,
    exclude: &Path,
    since: SystemTime,
    known: &BTreeSet<String>,
) -> ScanResult {
    let mut found = Vec::new();
    let start = if dir.is_empty() {
        source_root.to_path_buf()
    } else {
        source_root.join(dir)
    };
    walk_dir(&start, dir, exclude, &mut found);
    found.sort();

    let mut result = ScanResult::default();
    let mut seen = BTreeSet::new();
    for (path, mtime) in found {
        let is_known = known.contains(&path);
        if !is_known {
            result.new_files.push(path.clone());
        } else if mtime.is_some_and(|t| t > since) {
            result.modified_files.push(path.clone());
        } else {
            result.unchanged_files.push(path.clone());
        }
        seen.insert(path);
    }

    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };
    result.deleted_files = known
        .iter()
        .filter(|p| p.starts_with(&prefix) && !seen.contains(*p))
        .cloned()
        .collect();
    result
}

fn walk_dir(dir: &Path, rel: &str, exclude: &Path, found: &mut Vec<(String, Option<SystemTime>)>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not scan directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path == exclude {
            continue;
        }
        let logical = if rel.is_empty() {
            name.to_string()
        } else {
            format!("{rel}/{name}")
        };
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            walk_dir(&path, &logical, exclude, found);
        } else if meta.is_file() {
            found.push((logical, meta.modified().ok()));
        }
    }
}
