//! File-watcher change intake and reconciliation.
//!
//! Watcher threads record changes through [`ChangeReconciler::record`]; the
//! update thread takes the batch and applies it against the registry.
//! Directories are applied before files.

use std::sync::{Mutex, PoisonError};

use kiln_common::strip_meta;
use tracing::{debug, trace};

use crate::compiler::AssetCompiler;

/// Changes waiting for the next update tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Changed directories, relative to the source root.
    pub dirs: Vec<String>,
    /// Changed files, relative to the source root.
    pub files: Vec<String>,
}

impl PendingChanges {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Thread-safe intake for file-watcher notifications.
pub struct ChangeReconciler {
    ignore: Vec<String>,
    pending: Mutex<PendingChanges>,
}

impl ChangeReconciler {
    /// Creates an intake that drops changes to the `ignore`d paths.
    pub fn new(ignore: Vec<String>) -> Self {
        Self {
            ignore: ignore.iter().map(|p| normalize(p)).collect(),
            pending: Mutex::new(PendingChanges::default()),
        }
    }

    /// Returns `true` if changes to `path` are never reconciled.
    ///
    /// Paths with a component starting with `.` are ignored, as are the
    /// configured paths (compared case-insensitively).
    pub fn is_ignored(&self, path: &str) -> bool {
        path.split('/').any(|c| c.starts_with('.'))
            || self.ignore.iter().any(|i| i.eq_ignore_ascii_case(path))
    }

    /// Records a change. Returns `false` if the path is ignored.
    pub fn record(&self, path: &str, is_dir: bool) -> bool {
        if path.is_empty() || self.is_ignored(path) {
            trace!(path, "ignoring change");
            return false;
        }
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let list = if is_dir {
            &mut pending.dirs
        } else {
            &mut pending.files
        };
        if !list.iter().any(|p| p == path) {
            list.push(path.to_string());
        }
        true
    }

    /// Takes every recorded change.
    pub fn take(&self) -> PendingChanges {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns `true` if no changes are waiting.
    pub fn is_empty(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Normalizes a watcher path to the `/`-separated relative form.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut path = path.as_str();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.trim_matches('/').to_string()
}

/// Applies a batch of changes to `compiler`.
pub(crate) fn apply(compiler: &AssetCompiler, changes: PendingChanges) {
    for dir in &changes.dirs {
        apply_dir(compiler, dir);
    }
    for file in &changes.files {
        apply_file(compiler, file);
    }
}

fn apply_dir(compiler: &AssetCompiler, dir: &str) {
    if !compiler.source_root().join(dir).is_dir() {
        debug!(dir, "directory removed");
        compiler.remove_dir(dir);
        return;
    }
    let scan = compiler.scan(dir);
    for file in scan.new_files.iter().chain(&scan.modified_files) {
        if compiler.register_source(file) {
            compiler.push(file);
        }
    }
    for file in &scan.deleted_files {
        compiler.remove_source(file);
    }
    debug!(
        dir,
        new = scan.new_files.len(),
        modified = scan.modified_files.len(),
        deleted = scan.deleted_files.len(),
        "reconciled directory"
    );
    compiler.notify_list_changed(dir);
}

fn apply_file(compiler: &AssetCompiler, path: &str) {
    let file = strip_meta(path).unwrap_or(path);
    let exists = compiler.source_root().join(file).is_file();

    if compiler.has_compiler(file) {
        if exists {
            compiler.register_source(file);
            compiler.push(file);
        } else {
            debug!(path = file, "resource removed");
            compiler.remove_source(file);
        }
        return;
    }

    if !exists && compiler.registry().contains_under(file) {
        debug!(dir = file, "directory removed");
        compiler.remove_dir(file);
        return;
    }

    for dependent in compiler.dependents(file) {
        debug!(path = %dependent, dependency = file, "dependency changed");
        compiler.push(&dependent);
    }
}
