//! Shared foundational types used across the Kiln asset pipeline.
//!
//! This crate provides the path hash used to key resources and cache
//! artifacts, plus helpers for splitting resource paths into their file and
//! sub-resource parts.

#![warn(missing_docs)]

pub mod hash;
pub mod resource_path;

pub use hash::PathHash;
pub use resource_path::{
    dir_of, extension, meta_path, resource_part, strip_meta, subresource_part, META_SUFFIX,
};
