//! Incremental, dependency-tracking asset compilation.
//!
//! [`AssetCompiler`] keeps a registry of every compilable resource under a
//! source root, compiles stale resources on a background pool through
//! per-type [`Compiler`] plugins, and stores the output in a
//! [`CacheStore`](kiln_cache::CacheStore). A resource runtime integrates
//! through the [`LoadHook`] seam: loads of stale resources are deferred and
//! resumed once compilation finishes. File-watcher notifications feed
//! [`AssetCompiler::on_file_changed`] and are reconciled on every
//! [`update`](AssetCompiler::update) tick.
//!
//! Every compile job carries a per-path generation. A job whose generation
//! was superseded by a newer push is allowed to finish but its result is
//! discarded, so at most one result per path is ever applied.

#![warn(missing_docs)]

pub mod compiler;
pub mod deps;
pub mod error;
pub mod hook;
pub mod index;
pub mod observer;
pub mod plugin;
pub mod queue;
pub mod reconcile;
pub mod registry;
pub mod resource;
pub mod scan;

pub use compiler::{AssetCompiler, CompilerSettings};
pub use deps::DependencyTracker;
pub use error::{CompileError, CompilerError};
pub use hook::{LoadAction, LoadHook, NullRuntime, ResourceRuntime, ResourceState};
pub use index::RegistryIndex;
pub use plugin::{CompileContext, Compiler, CopyCompiler};
pub use queue::{CompileJob, CompileProgress, CompletedJob};
pub use registry::ResourceRegistry;
pub use resource::{ResourceItem, ResourceType};
pub use scan::ScanResult;
