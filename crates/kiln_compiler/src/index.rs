//! The persisted registry index.
//!
//! The index is stored as `_resources.json` in the cache directory. It lists
//! every registered resource path and the dependency edges recorded while
//! compiling, so a restart does not have to rediscover either. Its
//! modification time is the reference point for the start-up scan: sources
//! modified after it are treated as changed.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::CompilerError;

/// Name of the index file within the cache directory.
pub const INDEX_FILE: &str = "_resources.json";

/// Format version of the index file.
pub const INDEX_VERSION: u32 = 1;

/// Snapshot of the registry and dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryIndex {
    /// Format version that produced this file.
    pub version: u32,

    /// Registered resource paths, sorted.
    pub resources: Vec<String>,

    /// Dependency edges: file to the resources that read it.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl RegistryIndex {
    /// Creates an index at the current format version.
    pub fn new(mut resources: Vec<String>, dependencies: BTreeMap<String, Vec<String>>) -> Self {
        resources.sort();
        resources.dedup();
        Self {
            version: INDEX_VERSION,
            resources,
            dependencies,
        }
    }

    /// Loads the index from the cache directory, returning `None` if it is
    /// missing, unreadable or from another format version.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(cache_dir.join(INDEX_FILE)).ok()?;
        let index: Self = serde_json::from_str(&content).ok()?;
        index.is_compatible().then_some(index)
    }

    /// Writes the index to the cache directory.
    ///
    /// The file is written under a temporary name and renamed into place,
    /// so a crash never leaves a truncated index behind.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CompilerError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CompilerError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let json = serde_json::to_string_pretty(self).map_err(|e| CompilerError::IndexEncode {
            reason: e.to_string(),
        })?;
        let tmp = cache_dir.join(format!("{INDEX_FILE}.tmp"));
        std::fs::write(&tmp, json).map_err(|e| CompilerError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        let path = cache_dir.join(INDEX_FILE);
        std::fs::rename(&tmp, &path).map_err(|e| CompilerError::Io { path, source: e })
    }

    /// Returns `true` if this index was written by the current format version.
    pub fn is_compatible(&self) -> bool {
        self.version == INDEX_VERSION
    }

    /// Returns the modification time of the index in `cache_dir`.
    pub fn modified(cache_dir: &Path) -> Option<SystemTime> {
        kiln_cache::store::modified(&cache_dir.join(INDEX_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RegistryIndex {
        let mut deps = BTreeMap::new();
        deps.insert("shd/common.glsl".to_string(), vec!["mat/x.mat".to_string()]);
        RegistryIndex::new(
            vec![
                "tex/b.png".to_string(),
                "mat/x.mat".to_string(),
                "tex/b.png".to_string(),
            ],
            deps,
        )
    }

    #[test]
    fn new_sorts_and_dedups() {
        let index = sample();
        assert_eq!(index.resources, vec!["mat/x.mat", "tex/b.png"]);
        assert!(index.is_compatible());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample();
        index.save(dir.path()).unwrap();
        assert_eq!(RegistryIndex::load(dir.path()).unwrap(), index);
        assert!(!dir.path().join("_resources.json.tmp").exists());
        assert!(RegistryIndex::modified(dir.path()).is_some());
    }

    #[test]
    fn save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        sample().save(&nested).unwrap();
        assert!(nested.join(INDEX_FILE).exists());
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RegistryIndex::load(dir.path()).is_none());
        assert!(RegistryIndex::modified(dir.path()).is_none());
    }

    #[test]
    fn load_corrupt_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{ not json").unwrap();
        assert!(RegistryIndex::load(dir.path()).is_none());
    }

    #[test]
    fn load_other_version_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = sample();
        index.version = INDEX_VERSION + 1;
        index.save(dir.path()).unwrap();
        assert!(RegistryIndex::load(dir.path()).is_none());
    }

    #[test]
    fn dependencies_default_when_absent() {
        let index: RegistryIndex =
            serde_json::from_str(r#"{"version":1,"resources":["a.png"]}"#).unwrap();
        assert!(index.dependencies.is_empty());
        assert_eq!(index.resources, vec!["a.png"]);
    }
}
