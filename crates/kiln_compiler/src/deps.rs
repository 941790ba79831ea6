//! Reverse dependency edges between resources.

use std::collections::{BTreeMap, HashMap};

/// Tracks which resources must be recompiled when a file changes.
///
/// An edge `on -> from` means `from` read `on` while compiling. Each
/// dependent appears at most once per key, in insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyTracker {
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `from` depends on `on`.
    ///
    /// Returns `true` if the edge is new.
    pub fn register_dependency(&mut self, from: &str, on: &str) -> bool {
        let list = self.dependents.entry(on.to_string()).or_default();
        if list.iter().any(|d| d == from) {
            return false;
        }
        list.push(from.to_string());
        true
    }

    /// Returns the resources that depend on `on`.
    pub fn dependents(&self, on: &str) -> &[String] {
        self.dependents.get(on).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates over the resources to recompile after `on` changed.
    pub fn invalidate<'a>(&'a self, on: &str) -> impl Iterator<Item = &'a str> {
        self.dependents(on).iter().map(String::as_str)
    }

    /// Returns the number of files with at least one dependent.
    pub fn len(&self) -> usize {
        self.dependents.len()
    }

    /// Returns `true` if no edges are recorded.
    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }

    /// Returns the edges in a stable order for persistence.
    pub fn to_sorted(&self) -> BTreeMap<String, Vec<String>> {
        self.dependents
            .iter()
            .map(|(on, from)| (on.clone(), from.clone()))
            .collect()
    }

    /// Rebuilds a tracker from persisted edges, dropping duplicates.
    pub fn from_edges(edges: BTreeMap<String, Vec<String>>) -> Self {
        let mut tracker = Self::new();
        for (on, dependents) in edges {
            for from in dependents {
                tracker.register_dependency(&from, &on);
            }
        }
        tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_deduplicate() {
        let mut deps = DependencyTracker::new();
        assert!(deps.register_dependency("mat/x.mat", "shd/common.glsl"));
        assert!(!deps.register_dependency("mat/x.mat", "shd/common.glsl"));
        assert!(deps.register_dependency("mat/y.mat", "shd/common.glsl"));
        assert_eq!(deps.dependents("shd/common.glsl"), ["mat/x.mat", "mat/y.mat"]);
    }

    #[test]
    fn unknown_file_has_no_dependents() {
        let deps = DependencyTracker::new();
        assert!(deps.dependents("nothing").is_empty());
        assert_eq!(deps.invalidate("nothing").count(), 0);
    }

    #[test]
    fn invalidate_lists_direct_dependents_only() {
        let mut deps = DependencyTracker::new();
        deps.register_dependency("b.mat", "a.glsl");
        deps.register_dependency("c.model", "b.mat");
        let queued: Vec<&str> = deps.invalidate("a.glsl").collect();
        assert_eq!(queued, vec!["b.mat"]);
    }

    #[test]
    fn edges_rebuild_without_duplicates() {
        let mut edges = BTreeMap::new();
        edges.insert(
            "a.glsl".to_string(),
            vec!["b.mat".to_string(), "b.mat".to_string()],
        );
        let deps = DependencyTracker::from_edges(edges);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps.dependents("a.glsl"), ["b.mat"]);
        assert_eq!(deps.to_sorted()["a.glsl"], vec!["b.mat"]);
    }
}
