//! Resource type tags and registry entries.

use std::fmt;
use std::sync::Arc;

use kiln_common::{dir_of, PathHash};

/// A resource type tag, such as `texture` or `material`.
///
/// Types are compared by name. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(Arc<str>);

impl ResourceType {
    /// Creates a type tag with the given name.
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceType({})", self.0)
    }
}

/// A registry entry for one compilable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    /// Logical path, possibly with a `:` sub-resource suffix.
    pub path: String,
    /// The resolved resource type.
    pub resource_type: ResourceType,
    /// Hash of the owning directory, used for directory-scoped listings.
    pub dir_hash: PathHash,
}

impl ResourceItem {
    /// Creates an entry, deriving `dir_hash` from `path`.
    pub fn new(resource_type: ResourceType, path: &str) -> Self {
        Self {
            path: path.to_string(),
            resource_type,
            dir_hash: PathHash::of(dir_of(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_compare_by_name() {
        assert_eq!(ResourceType::new("texture"), ResourceType::new("texture"));
        assert_ne!(ResourceType::new("texture"), ResourceType::new("model"));
        assert_eq!(ResourceType::new("texture").to_string(), "texture");
    }

    #[test]
    fn dir_hash_ignores_file_and_subresource() {
        let a = ResourceItem::new(ResourceType::new("model"), "models/hero.fbx");
        let b = ResourceItem::new(ResourceType::new("anim"), "models/hero.fbx:walk.ani");
        let c = ResourceItem::new(ResourceType::new("model"), "models/villain.fbx");
        assert_eq!(a.dir_hash, b.dir_hash);
        assert_eq!(a.dir_hash, c.dir_hash);
        assert_eq!(a.dir_hash, PathHash::of("models"));
    }
}
