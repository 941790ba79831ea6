//! On-disk cache of compiled resources.
//!
//! Every compiled resource is stored as a single artifact file named after
//! the hash of its resource path. Artifacts carry a small binary header and
//! are LZ4-compressed when that pays off. A version marker in the cache
//! directory invalidates every artifact when the on-disk format changes.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod store;
pub mod version;

pub use artifact::{ArtifactHeader, Compressor, COMPRESSION_THRESHOLD};
pub use error::CacheError;
pub use store::CacheStore;
pub use version::{VersionCheck, CACHE_FORMAT_VERSION};
