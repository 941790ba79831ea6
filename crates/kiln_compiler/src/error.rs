//! Error types for the asset compiler.

use std::path::PathBuf;

use kiln_cache::CacheError;

/// Errors reported by a [`Compiler`](crate::Compiler) plugin.
///
/// These never cross the job boundary as panics or early returns: the
/// worker logs them and reports the job as failed.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A source, sidecar or dependency file could not be read.
    #[error("could not read {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No compiler is registered for the resource's type.
    #[error("unknown resource type for {path}")]
    NoCompiler {
        /// The resource path.
        path: String,
    },

    /// The plugin rejected the source.
    #[error("failed to compile {path}: {reason}")]
    Failed {
        /// The resource path.
        path: String,
        /// Plugin-provided description.
        reason: String,
    },
}

impl CompileError {
    /// Creates a plugin failure for `path`.
    pub fn failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by [`AssetCompiler`](crate::AssetCompiler) set-up and
/// persistence.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    /// The cache directory could not be initialised.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// An I/O error occurred outside the cache store.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The registry index could not be encoded.
    #[error("failed to encode registry index: {reason}")]
    IndexEncode {
        /// Description of the failure.
        reason: String,
    },

    /// An extension could not be registered.
    #[error("cannot register extension '{ext}': {reason}")]
    Extension {
        /// The offending extension.
        ext: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The background worker pool could not be created.
    #[error("failed to start compile workers: {reason}")]
    WorkerPool {
        /// Description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_display() {
        let err = CompileError::failed("mat/x.mat", "unknown shader");
        assert_eq!(err.to_string(), "failed to compile mat/x.mat: unknown shader");
    }

    #[test]
    fn no_compiler_display() {
        let err = CompileError::NoCompiler {
            path: "a.xyz".to_string(),
        };
        assert!(err.to_string().contains("a.xyz"));
    }

    #[test]
    fn cache_error_is_transparent() {
        let err: CompilerError = CacheError::Serialization {
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "serialization error: bad");
    }

    #[test]
    fn extension_display() {
        let err = CompilerError::Extension {
            ext: "png".to_string(),
            reason: "already registered".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot register extension 'png': already registered"
        );
    }
}
