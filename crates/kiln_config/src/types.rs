//! Configuration types deserialized from `kiln.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Default cache directory, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".kiln/resources";

/// Default size above which compiled artifacts are considered for compression.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 4096;

/// The top-level project configuration parsed from `kiln.toml`.
///
/// Every section is optional; [`KilnConfig::default`] describes a project
/// rooted at the current directory with no resource types registered.
#[derive(Debug, Default, Deserialize)]
pub struct KilnConfig {
    /// Core project metadata.
    #[serde(default)]
    pub project: ProjectMeta,
    /// Compiled-artifact cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Background compilation settings.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// File-watcher event filtering.
    #[serde(default)]
    pub watch: WatchConfig,
    /// Resource types keyed by type name (e.g., "texture", "material").
    #[serde(default)]
    pub types: BTreeMap<String, TypeConfig>,
}

/// Core project metadata.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    #[serde(default)]
    pub name: String,
    /// Directory holding source assets, relative to the project root.
    #[serde(default = "default_source_root")]
    pub source_root: String,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            source_root: default_source_root(),
        }
    }
}

fn default_source_root() -> String {
    ".".to_string()
}

/// Compiled-artifact cache settings.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Cache directory, relative to the project root.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    /// Payloads larger than this many bytes are considered for compression.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

fn default_compression_threshold() -> usize {
    DEFAULT_COMPRESSION_THRESHOLD
}

/// Background compilation settings.
#[derive(Debug, Default, Deserialize)]
pub struct CompilerConfig {
    /// Number of worker threads; `0` lets the pool pick.
    #[serde(default)]
    pub workers: usize,
    /// Maximum jobs dispatched per update tick; `0` dispatches all of them.
    #[serde(default)]
    pub jobs_per_tick: usize,
}

/// File-watcher event filtering.
#[derive(Debug, Default, Deserialize)]
pub struct WatchConfig {
    /// Relative paths whose change notifications are ignored (e.g. log files).
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// A resource type: the extensions it claims and how it is compiled.
#[derive(Debug, Deserialize)]
pub struct TypeConfig {
    /// File extensions (without the dot) mapped to this type.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub extensions: Vec<String>,
    /// Built-in compiler used for this type.
    #[serde(default)]
    pub compiler: CompilerKind,
}

/// Built-in compilers selectable from configuration.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    /// Store the source bytes unchanged as the compiled artifact.
    #[default]
    Copy,
    /// Register the extension but never compile; resources load directly.
    None,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `extensions = "png"` (string) and
/// `extensions = ["png", "tga"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = KilnConfig::default();
        assert_eq!(config.project.source_root, ".");
        assert_eq!(config.cache.dir, DEFAULT_CACHE_DIR);
        assert_eq!(config.cache.compression_threshold, 4096);
        assert_eq!(config.compiler.workers, 0);
        assert!(config.types.is_empty());
    }

    #[test]
    fn extensions_single_string() {
        let t: TypeConfig = toml::from_str("extensions = \"png\"").unwrap();
        assert_eq!(t.extensions, vec!["png"]);
        assert_eq!(t.compiler, CompilerKind::Copy);
    }

    #[test]
    fn extensions_list() {
        let t: TypeConfig =
            toml::from_str("extensions = [\"png\", \"tga\"]\ncompiler = \"none\"").unwrap();
        assert_eq!(t.extensions, vec!["png", "tga"]);
        assert_eq!(t.compiler, CompilerKind::None);
    }

    #[test]
    fn unknown_compiler_rejected() {
        let result: Result<TypeConfig, _> =
            toml::from_str("extensions = \"png\"\ncompiler = \"magic\"");
        assert!(result.is_err());
    }
}
