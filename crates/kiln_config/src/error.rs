//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `kiln.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// An extension in a `[types.*]` table cannot be used as a lookup key.
    #[error("invalid extension '{ext}' in types.{type_name}: {reason}")]
    InvalidExtension {
        /// The resource type that declared the extension.
        type_name: String,
        /// The offending extension.
        ext: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two resource types claim the same extension.
    #[error("extension '{ext}' claimed by both '{first}' and '{second}'")]
    DuplicateExtension {
        /// The contested extension.
        ext: String,
        /// The type that claimed it first.
        first: String,
        /// The type that claimed it again.
        second: String,
    },
}
