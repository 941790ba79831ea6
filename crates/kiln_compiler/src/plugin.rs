//! Compiler plugins and the context they compile in.

use std::path::{Path, PathBuf};

use kiln_cache::CacheStore;
use kiln_common::meta_path;

use crate::error::CompileError;

/// Turns a source file into compiled bytes for one resource type.
///
/// Plugins run on worker threads and may be invoked concurrently for
/// different paths.
pub trait Compiler: Send + Sync {
    /// Compiles the source behind `ctx.path()`.
    ///
    /// The returned bytes are stored as the artifact for the source file.
    /// Further artifacts (sub-resources) are written through
    /// [`CompileContext::write_artifact`].
    fn compile(&self, ctx: &mut CompileContext<'_>) -> Result<Vec<u8>, CompileError>;

    /// Lists the resources a source file produces when it is registered.
    ///
    /// `source` is the file on disk. The default registers the file itself.
    fn discover(&self, path: &str, source: &Path) -> Vec<String> {
        let _ = source;
        vec![path.to_string()]
    }
}

/// Per-job state handed to a [`Compiler`].
pub struct CompileContext<'a> {
    path: &'a str,
    store: &'a CacheStore,
    dependencies: Vec<String>,
    outputs: Vec<String>,
}

impl<'a> CompileContext<'a> {
    /// Creates a context for compiling `path` into `store`.
    pub fn new(path: &'a str, store: &'a CacheStore) -> Self {
        Self {
            path,
            store,
            dependencies: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Returns the source-file path being compiled.
    pub fn path(&self) -> &str {
        self.path
    }

    /// Returns the on-disk location of the source file.
    pub fn source_path(&self) -> PathBuf {
        self.store.source_path(self.path)
    }

    /// Reads the whole source file.
    pub fn read_source(&self) -> Result<Vec<u8>, CompileError> {
        read_file(&self.source_path())
    }

    /// Reads the source's `.meta` sidecar, if there is one.
    pub fn read_meta(&self) -> Option<Vec<u8>> {
        std::fs::read(self.store.source_root().join(meta_path(self.path))).ok()
    }

    /// Reads another source file and records it as a dependency.
    pub fn read_dependency(&mut self, path: &str) -> Result<Vec<u8>, CompileError> {
        self.register_dependency(path);
        read_file(&self.store.source_path(path))
    }

    /// Records that this resource must be recompiled when `on` changes.
    pub fn register_dependency(&mut self, on: &str) {
        if !self.dependencies.iter().any(|d| d == on) {
            self.dependencies.push(on.to_string());
        }
    }

    /// Writes an extra artifact, typically a sub-resource such as
    /// `models/hero.fbx:walk.ani`.
    ///
    /// The path is added to the registry when the job is drained.
    pub fn write_artifact(&mut self, path: &str, data: &[u8]) -> bool {
        let written = self.store.write(path, data);
        if written {
            self.outputs.push(path.to_string());
        }
        written
    }

    /// Returns the dependencies recorded so far.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.dependencies, self.outputs)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, CompileError> {
    std::fs::read(path).map_err(|e| CompileError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Stores the source bytes unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyCompiler;

impl Compiler for CopyCompiler {
    fn compile(&self, ctx: &mut CompileContext<'_>) -> Result<Vec<u8>, CompileError> {
        ctx.read_source()
    }
}
