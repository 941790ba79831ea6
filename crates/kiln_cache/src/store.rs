//! Compiled artifact storage keyed by resource path.
//!
//! Artifacts live at `<cache_dir>/<path-hash>.res`, one file per resource
//! (sub-resources included). Freshness is decided by comparing modification
//! times of the artifact, its source file and the source's `.meta` sidecar.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use kiln_common::{meta_path, resource_part, PathHash};

use crate::artifact::Compressor;
use crate::error::CacheError;
use crate::version::{ensure_version, VersionCheck};

/// File extension for compiled artifacts.
pub const ARTIFACT_EXT: &str = "res";

/// Store for compiled resource artifacts.
///
/// Writes never fail loudly: I/O problems are logged and reported as
/// `false`, and reads turn any corruption into a cache miss.
pub struct CacheStore {
    /// Directory the logical resource paths are relative to.
    source_root: PathBuf,

    /// Directory holding artifacts, the version marker and the index.
    cache_dir: PathBuf,

    compressor: Compressor,
}

impl CacheStore {
    /// Opens (creating if necessary) the cache directory and validates its
    /// version marker.
    ///
    /// This is the only cache operation whose failure is fatal: if the
    /// directory cannot be created or the marker cannot be written, the
    /// error is returned to the caller.
    pub fn open(
        source_root: &Path,
        cache_dir: &Path,
        compression_threshold: usize,
    ) -> Result<(Self, VersionCheck), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let check = ensure_version(cache_dir)?;

        let store = Self {
            source_root: source_root.to_path_buf(),
            cache_dir: cache_dir.to_path_buf(),
            compressor: Compressor::new(compression_threshold),
        };
        Ok((store, check))
    }

    /// Returns the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the source root.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Returns the artifact file path for a resource path.
    pub fn artifact_path(&self, path: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{ARTIFACT_EXT}", PathHash::of(path)))
    }

    /// Returns the on-disk location of a logical source path.
    pub fn source_path(&self, path: &str) -> PathBuf {
        self.source_root.join(resource_part(path))
    }

    /// Writes compiled bytes for `path`, returning `false` on failure.
    pub fn write(&self, path: &str, data: &[u8]) -> bool {
        match self.try_write(path, data) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(resource = path, error = %e, "Could not write compiled resource");
                false
            }
        }
    }

    /// Writes compiled bytes for `path`, propagating the failure.
    pub fn try_write(&self, path: &str, data: &[u8]) -> Result<(), CacheError> {
        let encoded = self.compressor.encode(data)?;
        let out_path = self.artifact_path(path);
        std::fs::write(&out_path, &encoded).map_err(|e| CacheError::Io {
            path: out_path,
            source: e,
        })
    }

    /// Reads and decodes the artifact for `path`.
    ///
    /// Returns `None` if the artifact is missing or corrupt. This is
    /// fail-safe: corruption results in a cache miss.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        match self.load(path) {
            Ok(data) => Some(data),
            Err(CacheError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                None
            }
            Err(e) => {
                tracing::warn!(resource = path, error = %e, "Discarding unreadable artifact");
                None
            }
        }
    }

    /// Reads and decodes the artifact for `path`, reporting why it failed.
    pub fn load(&self, path: &str) -> Result<Vec<u8>, CacheError> {
        let artifact = self.artifact_path(path);
        let raw = std::fs::read(&artifact).map_err(|e| CacheError::Io {
            path: artifact.clone(),
            source: e,
        })?;
        Compressor::decode(&raw, &artifact)
    }

    /// Deletes the artifact for `path`. Returns `true` if a file was removed.
    pub fn remove(&self, path: &str) -> bool {
        let artifact = self.artifact_path(path);
        match std::fs::remove_file(&artifact) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %artifact.display(), error = %e, "Could not delete artifact");
                false
            }
        }
    }

    /// Returns `true` if the artifact for `path` exists and is at least as
    /// new as both its source file and the source's `.meta` sidecar.
    ///
    /// A missing source or sidecar counts as infinitely old.
    pub fn is_fresh(&self, path: &str) -> bool {
        let Some(artifact_time) = modified(&self.artifact_path(path)) else {
            return false;
        };
        let source_time = modified(&self.source_path(path)).unwrap_or(SystemTime::UNIX_EPOCH);
        let meta_time =
            modified(&self.source_root.join(meta_path(path))).unwrap_or(SystemTime::UNIX_EPOCH);
        artifact_time >= source_time && artifact_time >= meta_time
    }

    /// Removes every artifact file from the cache directory.
    ///
    /// Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = std::fs::read_dir(&self.cache_dir).map_err(|e| CacheError::Io {
            path: self.cache_dir.clone(),
            source: e,
        })?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: self.cache_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXT) {
                std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Returns the modification time of `path`, or `None` if it cannot be read.
pub fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactHeader, COMPRESSION_THRESHOLD};
    use std::time::Duration;

    fn make_store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join(".kiln").join("resources");
        let (store, _) = CacheStore::open(dir.path(), &cache_dir, COMPRESSION_THRESHOLD).unwrap();
        (dir, store)
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn write_and_read_roundtrip() {
        let (_dir, store) = make_store();
        assert!(store.write("tex/a.png", b"hello artifact world"));
        assert_eq!(store.read("tex/a.png").unwrap(), b"hello artifact world");
    }

    #[test]
    fn write_large_payload() {
        let (_dir, store) = make_store();
        let data: Vec<u8> = (0..100_000).map(|i| (i % 256) as u8).collect();
        assert!(store.write("mesh/big.fbx", &data));
        assert_eq!(store.read("mesh/big.fbx").unwrap(), data);

        let raw = std::fs::read(store.artifact_path("mesh/big.fbx")).unwrap();
        assert!(ArtifactHeader::decode(&raw).unwrap().is_compressed());
    }

    #[test]
    fn read_missing_returns_none() {
        let (_dir, store) = make_store();
        assert!(store.read("nonexistent.png").is_none());
    }

    #[test]
    fn read_corrupt_data_returns_none() {
        let (_dir, store) = make_store();
        std::fs::write(store.artifact_path("bad.png"), b"AB").unwrap();
        assert!(store.read("bad.png").is_none());
        assert!(matches!(
            store.load("bad.png"),
            Err(CacheError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn artifact_path_format() {
        let (_dir, store) = make_store();
        let path = store.artifact_path("tex/a.png");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, format!("{}.res", PathHash::of("tex/a.png")));
        assert!(path.starts_with(store.cache_dir()));
    }

    #[test]
    fn identical_writes_are_byte_identical() {
        let (_dir, store) = make_store();
        let data: Vec<u8> = b"abc".iter().copied().cycle().take(10_000).collect();
        store.write("a.mat", &data);
        let first = std::fs::read(store.artifact_path("a.mat")).unwrap();
        store.write("a.mat", &data);
        let second = std::fs::read(store.artifact_path("a.mat")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_artifact_is_never_fresh() {
        let (dir, store) = make_store();
        std::fs::write(dir.path().join("a.png"), b"src").unwrap();
        assert!(!store.is_fresh("a.png"));
    }

    #[test]
    fn fresh_after_write_until_source_touched() {
        let (dir, store) = make_store();
        let src = dir.path().join("a.png");
        std::fs::write(&src, b"src").unwrap();
        set_mtime(&src, SystemTime::now() - Duration::from_secs(60));

        store.write("a.png", b"compiled");
        assert!(store.is_fresh("a.png"));

        set_mtime(&src, SystemTime::now() + Duration::from_secs(60));
        assert!(!store.is_fresh("a.png"));
    }

    #[test]
    fn newer_meta_makes_stale() {
        let (dir, store) = make_store();
        let src = dir.path().join("a.png");
        std::fs::write(&src, b"src").unwrap();
        set_mtime(&src, SystemTime::now() - Duration::from_secs(60));
        store.write("a.png", b"compiled");

        let meta = dir.path().join("a.png.meta");
        std::fs::write(&meta, b"filter = \"point\"").unwrap();
        set_mtime(&meta, SystemTime::now() + Duration::from_secs(60));
        assert!(!store.is_fresh("a.png"));
    }

    #[test]
    fn subresource_freshness_uses_source_file() {
        let (dir, store) = make_store();
        let src = dir.path().join("hero.fbx");
        std::fs::write(&src, b"src").unwrap();
        set_mtime(&src, SystemTime::now() - Duration::from_secs(60));
        store.write("hero.fbx:walk.ani", b"anim");
        assert!(store.is_fresh("hero.fbx:walk.ani"));

        set_mtime(&src, SystemTime::now() + Duration::from_secs(60));
        assert!(!store.is_fresh("hero.fbx:walk.ani"));
    }

    #[test]
    fn remove_deletes_artifact() {
        let (_dir, store) = make_store();
        store.write("a.png", b"x");
        assert!(store.remove("a.png"));
        assert!(!store.remove("a.png"));
        assert!(store.read("a.png").is_none());
    }

    #[test]
    fn clear_removes_only_artifacts() {
        let (_dir, store) = make_store();
        store.write("a.png", b"a");
        store.write("b.png", b"b");
        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.cache_dir().join(crate::version::VERSION_FILE).exists());
    }

    #[test]
    fn write_into_missing_dir_returns_false() {
        let (_dir, store) = make_store();
        std::fs::remove_dir_all(store.cache_dir()).unwrap();
        assert!(!store.write("a.png", b"x"));
    }
}
