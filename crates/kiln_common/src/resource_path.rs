//! Helpers for logical resource paths.
//!
//! A resource path is a `/`-separated path relative to the source root,
//! optionally followed by a sub-resource suffix after `:`
//! (`models/hero.fbx:walk.ani`). The part before `:` names the source file
//! on disk; the part after it names one of the resources that file produces.

/// Suffix of the per-resource configuration sidecar.
pub const META_SUFFIX: &str = ".meta";

/// Returns the source-file part of a resource path.
pub fn resource_part(path: &str) -> &str {
    match path.split_once(':') {
        Some((file, _)) => file,
        None => path,
    }
}

/// Returns the sub-resource part of a resource path, or the whole path when
/// it has no `:` suffix.
pub fn subresource_part(path: &str) -> &str {
    match path.split_once(':') {
        Some((_, sub)) => sub,
        None => path,
    }
}

/// Returns the extension of the last path component, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext)
}

/// Returns the directory of the source-file part, without a trailing slash.
pub fn dir_of(path: &str) -> &str {
    let file = resource_part(path);
    match file.rfind(['/', '\\']) {
        Some(idx) => &file[..idx],
        None => "",
    }
}

/// Returns the path of the `.meta` sidecar for a source file.
pub fn meta_path(path: &str) -> String {
    format!("{}{META_SUFFIX}", resource_part(path))
}

/// Strips a trailing `.meta` suffix, returning the underlying resource path.
pub fn strip_meta(path: &str) -> Option<&str> {
    path.strip_suffix(META_SUFFIX).filter(|p| !p.is_empty())
}
