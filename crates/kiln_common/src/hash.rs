//! Path hashing for resource lookup and cache artifact naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 64-bit hash of a resource path computed using XXH3.
///
/// Keys the resource registry and names the compiled artifact on disk
/// (`<cache_dir>/<hash>.res`). The hash is taken over the exact path
/// string, including any sub-resource suffix, so `model.fbx` and
/// `model.fbx:walk.ani` hash differently.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathHash(u64);

impl PathHash {
    /// Computes the hash of a resource path.
    pub fn of(path: &str) -> Self {
        Self(xxhash_rust::xxh3::xxh3_64(path.as_bytes()))
    }

    /// Returns the raw 64-bit value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathHash({:016x})", self.0)
    }
}
