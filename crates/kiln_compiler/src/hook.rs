//! The seam between the compiler and a resource runtime.
//!
//! The runtime asks [`LoadHook::before_load`] before loading any resource.
//! A [`LoadAction::Deferred`] answer means the compiler now owns the load:
//! once the compile finishes it calls back into the runtime through
//! [`ResourceRuntime`] to resume or reload it.

/// Whether the runtime may load a resource straight away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    /// Load from the cache or the source now.
    Immediate,
    /// Hold the load until the compiler resumes it.
    Deferred,
}

/// Runtime-side state of a resource, as seen by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Known to the runtime but not loaded.
    Empty,
    /// Loading normally.
    Loading,
    /// Load deferred by [`LoadHook::before_load`].
    Hooked,
    /// Loaded.
    Ready,
    /// The last load failed.
    Failed,
}

/// Hooks a resource runtime calls on the compiler.
pub trait LoadHook {
    /// Decides whether the runtime may load `path` immediately.
    fn before_load(&self, path: &str) -> LoadAction;

    /// Reports that `requester` read `dependency` while loading.
    fn on_raw_dependency_read(&self, requester: &str, dependency: &str);
}

/// Calls the compiler makes into a resource runtime.
pub trait ResourceRuntime {
    /// Returns the state of `path`, or `None` if the runtime does not know it.
    fn state(&self, path: &str) -> Option<ResourceState>;

    /// Reloads a resource that is already loaded or failed.
    fn reload(&self, path: &str);

    /// Resumes a load previously deferred by [`LoadHook::before_load`].
    fn continue_load(&self, path: &str, success: bool);
}

/// A runtime with no resources, for headless batch compiles.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRuntime;

impl ResourceRuntime for NullRuntime {
    fn state(&self, _path: &str) -> Option<ResourceState> {
        None
    }

    fn reload(&self, _path: &str) {}

    fn continue_load(&self, _path: &str, _success: bool) {}
}
