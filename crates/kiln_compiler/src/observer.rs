//! Change notifications for editor UI and tooling.

use std::sync::{PoisonError, RwLock};

/// Callback fired when the set of resources under a path changes.
pub type ListChangedFn = Box<dyn Fn(&str) + Send + Sync>;

/// Callback fired after a resource was compiled, with the outcome.
pub type CompiledFn = Box<dyn Fn(&str, bool) + Send + Sync>;

/// Registered observers.
///
/// Callbacks run on the thread that calls
/// [`AssetCompiler::update`](crate::AssetCompiler::update) and must not
/// register further observers.
#[derive(Default)]
pub struct Observers {
    list_changed: RwLock<Vec<ListChangedFn>>,
    compiled: RwLock<Vec<CompiledFn>>,
}

impl Observers {
    /// Adds a list-changed observer.
    pub fn on_list_changed(&self, f: ListChangedFn) {
        self.list_changed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(f);
    }

    /// Adds a resource-compiled observer.
    pub fn on_resource_compiled(&self, f: CompiledFn) {
        self.compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(f);
    }

    pub(crate) fn notify_list_changed(&self, path: &str) {
        for f in self
            .list_changed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            f(path);
        }
    }

    pub(crate) fn notify_compiled(&self, path: &str, success: bool) {
        for f in self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            f(path, success);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_observer_is_notified() {
        let observers = Observers::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            observers.on_list_changed(Box::new(move |path| {
                seen.lock().unwrap().push(format!("{tag}:{path}"));
            }));
        }
        observers.notify_list_changed("tex");
        assert_eq!(*seen.lock().unwrap(), vec!["a:tex", "b:tex"]);
    }

    #[test]
    fn compiled_carries_outcome() {
        let observers = Observers::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        observers.on_resource_compiled(Box::new(move |path, ok| {
            sink.lock().unwrap().push((path.to_string(), ok));
        }));
        observers.notify_compiled("a.png", false);
        assert_eq!(*seen.lock().unwrap(), vec![("a.png".to_string(), false)]);
    }
}
