//! The set of known compilable resources and the extension lookup table.
//!
//! Both tables sit behind their own [`RwLock`]. Readers that need a
//! consistent view across several lookups hold the guard returned by
//! [`ResourceRegistry::lock`]; callbacks into other components are made only
//! after the guard is released.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use kiln_common::{extension, resource_part, subresource_part, PathHash};
use kiln_config::MAX_EXTENSION_LEN;

use crate::error::CompilerError;
use crate::resource::{ResourceItem, ResourceType};

/// Read guard over the registry's item table.
pub type RegistryGuard<'a> = RwLockReadGuard<'a, HashMap<PathHash, ResourceItem>>;

/// Registry of compilable resources keyed by path hash.
#[derive(Default)]
pub struct ResourceRegistry {
    items: RwLock<HashMap<PathHash, ResourceItem>>,
    extensions: RwLock<HashMap<String, ResourceType>>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an extension (without the dot) to a resource type.
    ///
    /// Extensions are matched case-insensitively. Registering the same
    /// extension twice, or one longer than [`MAX_EXTENSION_LEN`], is an error.
    pub fn register_extension(&self, ext: &str, ty: ResourceType) -> Result<(), CompilerError> {
        if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.is_ascii() {
            return Err(CompilerError::Extension {
                ext: ext.to_string(),
                reason: format!("must be 1 to {MAX_EXTENSION_LEN} ASCII characters"),
            });
        }
        let mut table = self.extensions.write().unwrap_or_else(PoisonError::into_inner);
        let key = ext.to_ascii_lowercase();
        if let Some(existing) = table.get(&key) {
            return Err(CompilerError::Extension {
                ext: ext.to_string(),
                reason: format!("already registered to '{existing}'"),
            });
        }
        table.insert(key, ty);
        Ok(())
    }

    /// Resolves the resource type of a path from the extension of its
    /// sub-resource part.
    pub fn resolve_type(&self, path: &str) -> Option<ResourceType> {
        let ext = extension(subresource_part(path))?;
        if ext.len() > MAX_EXTENSION_LEN {
            return None;
        }
        let table = self.extensions.read().unwrap_or_else(PoisonError::into_inner);
        table.get(&ext.to_ascii_lowercase()).cloned()
    }

    /// Returns `true` if `ext` is registered to `ty`.
    pub fn accepts_extension(&self, ext: &str, ty: &ResourceType) -> bool {
        let table = self.extensions.read().unwrap_or_else(PoisonError::into_inner);
        table.get(&ext.to_ascii_lowercase()) == Some(ty)
    }

    /// Adds or replaces the entry for `path`.
    ///
    /// Returns `true` if the path was not registered before.
    pub fn register(&self, ty: ResourceType, path: &str) -> bool {
        let item = ResourceItem::new(ty, path);
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(PathHash::of(path), item).is_none()
    }

    /// Registers `path` with its resolved type unless it is already known.
    ///
    /// Returns `true` if an entry was inserted.
    pub fn ensure(&self, path: &str) -> bool {
        let hash = PathHash::of(path);
        if self.lock().contains_key(&hash) {
            return false;
        }
        let Some(ty) = self.resolve_type(path) else {
            return false;
        };
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.contains_key(&hash) {
            return false;
        }
        items.insert(hash, ResourceItem::new(ty, path));
        true
    }

    /// Returns `true` if `path` is registered.
    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(&PathHash::of(path))
    }

    /// Returns a copy of the entry for `path`.
    pub fn get(&self, path: &str) -> Option<ResourceItem> {
        self.lock().get(&PathHash::of(path)).cloned()
    }

    /// Returns copies of every entry produced by the source file `file`,
    /// sorted by path.
    pub fn items_for_source(&self, file: &str) -> Vec<ResourceItem> {
        let mut found: Vec<ResourceItem> = self
            .lock()
            .values()
            .filter(|item| resource_part(&item.path) == file)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.path.cmp(&b.path));
        found
    }

    /// Removes every entry produced by the source file `file`.
    ///
    /// Returns the removed paths, sorted.
    pub fn remove_source(&self, file: &str) -> Vec<String> {
        self.remove_where(|path| resource_part(path) == file)
    }

    /// Removes every entry whose source file lives under `dir`.
    ///
    /// Returns the removed paths, sorted.
    pub fn remove_under(&self, dir: &str) -> Vec<String> {
        let dir = dir.trim_end_matches('/');
        if dir.is_empty() {
            return self.remove_where(|_| true);
        }
        let prefix = format!("{dir}/");
        self.remove_where(|path| resource_part(path).starts_with(&prefix))
    }

    /// Returns `true` if any entry's source file lives under `dir`.
    pub fn contains_under(&self, dir: &str) -> bool {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.lock()
            .values()
            .any(|item| resource_part(&item.path).starts_with(&prefix))
    }

    fn remove_where(&self, matches: impl Fn(&str) -> bool) -> Vec<String> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = Vec::new();
        items.retain(|_, item| {
            if matches(&item.path) {
                removed.push(item.path.clone());
                false
            } else {
                true
            }
        });
        removed.sort();
        removed
    }

    /// Acquires a read lock over the item table.
    pub fn lock(&self) -> RegistryGuard<'_> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns every registered path, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().values().map(|i| i.path.clone()).collect();
        paths.sort();
        paths
    }

    /// Returns the distinct source files behind the registered paths.
    pub fn source_files(&self) -> BTreeSet<String> {
        self.lock()
            .values()
            .map(|item| resource_part(&item.path).to_string())
            .collect()
    }

    /// Returns registered paths equal to `path` when compared
    /// case-insensitively.
    pub fn similar_paths(&self, path: &str) -> Vec<String> {
        let mut similar: Vec<String> = self
            .lock()
            .values()
            .filter(|item| item.path.eq_ignore_ascii_case(path))
            .map(|item| item.path.clone())
            .collect();
        similar.sort();
        similar
    }

    /// Returns the number of registered resources.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
