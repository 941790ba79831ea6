//! Cache-format version marker.
//!
//! The cache directory holds a `_version.bin` file containing a single
//! little-endian `u32`. When the marker is missing, unreadable or different
//! from [`CACHE_FORMAT_VERSION`], every file in the directory is deleted and
//! a fresh marker is written, forcing a full rebuild.

use std::path::Path;

use crate::error::CacheError;

/// Current cache-format version. Increment on breaking changes to the
/// artifact header, payload encoding or index layout.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Name of the version marker file within the cache directory.
pub const VERSION_FILE: &str = "_version.bin";

/// Outcome of validating the cache directory at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// The marker matched; existing artifacts are usable.
    Current,
    /// The marker was missing or different and the directory was wiped.
    Rebuilt {
        /// Version found on disk, if the marker could be read.
        found: Option<u32>,
        /// Number of files deleted.
        removed: usize,
    },
}

/// Validates the version marker in `cache_dir`, wiping the directory on a
/// mismatch.
///
/// Fails only when the marker cannot be written, which means the cache
/// directory is unusable.
pub fn ensure_version(cache_dir: &Path) -> Result<VersionCheck, CacheError> {
    let marker = inspect_marker(cache_dir);
    match marker {
        Marker::Version(CACHE_FORMAT_VERSION) => return Ok(VersionCheck::Current),
        Marker::Version(found) => tracing::warn!(
            found,
            expected = CACHE_FORMAT_VERSION,
            dir = %cache_dir.display(),
            "Unsupported cache version; rebuilding all assets"
        ),
        Marker::Malformed => tracing::warn!(
            dir = %cache_dir.display(),
            "Corrupt cache version marker; rebuilding all assets"
        ),
        Marker::Missing => tracing::info!(
            dir = %cache_dir.display(),
            "No cache version marker; starting a fresh cache"
        ),
    }

    let (removed, failed) = clear_files(cache_dir);
    if failed > 0 {
        tracing::error!(
            dir = %cache_dir.display(),
            failed,
            "Could not delete all cached files; delete the directory manually"
        );
    }
    write_marker(cache_dir)?;

    let found = match marker {
        Marker::Version(found) => Some(found),
        Marker::Missing | Marker::Malformed => None,
    };
    Ok(VersionCheck::Rebuilt { found, removed })
}

/// Reads the version marker, returning `None` if it is missing or malformed.
pub fn read_marker(cache_dir: &Path) -> Option<u32> {
    match inspect_marker(cache_dir) {
        Marker::Version(version) => Some(version),
        Marker::Missing | Marker::Malformed => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Missing,
    Malformed,
    Version(u32),
}

fn inspect_marker(cache_dir: &Path) -> Marker {
    let bytes = match std::fs::read(cache_dir.join(VERSION_FILE)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Marker::Missing,
        Err(e) => {
            tracing::debug!(dir = %cache_dir.display(), error = %e, "Could not read version marker");
            return Marker::Malformed;
        }
    };
    match <[u8; 4]>::try_from(bytes.as_slice()) {
        Ok(bytes) => Marker::Version(u32::from_le_bytes(bytes)),
        Err(_) => Marker::Malformed,
    }
}

fn write_marker(cache_dir: &Path) -> Result<(), CacheError> {
    let path = cache_dir.join(VERSION_FILE);
    std::fs::write(&path, CACHE_FORMAT_VERSION.to_le_bytes())
        .map_err(|e| CacheError::Io { path, source: e })
}

/// Deletes every regular file directly inside `dir`.
///
/// Returns `(removed, failed)` counts.
fn clear_files(dir: &Path) -> (usize, usize) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return (0, 0);
    };

    let mut removed = 0;
    let mut failed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Could not delete cached file");
                failed += 1;
            }
        }
    }
    (removed, failed)
}
