//! `kiln clean`: delete compiled artifacts and the registry index.

use std::path::Path;

use kiln_cache::CacheStore;
use kiln_compiler::index::INDEX_FILE;
use kiln_compiler::CompilerSettings;

use crate::pipeline::load_project_config;
use crate::GlobalArgs;

/// Runs the `kiln clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project_config(global)?;
    let settings = CompilerSettings::from_config(&root, &config);
    let removed = clean(&settings.source_root, &settings.cache_dir, settings.compression_threshold)?;
    if !global.quiet {
        eprintln!("     Removed {removed} artifacts from {}", settings.cache_dir.display());
    }
    Ok(0)
}

/// Removes every artifact and the index, keeping the version marker.
fn clean(
    source_root: &Path,
    cache_dir: &Path,
    threshold: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    let (store, _) = CacheStore::open(source_root, cache_dir, threshold)?;
    let removed = store.clear()?;
    let index = cache_dir.join(INDEX_FILE);
    if index.exists() {
        std::fs::remove_file(&index)?;
    }
    Ok(removed)
}
