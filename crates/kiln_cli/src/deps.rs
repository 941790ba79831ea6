//! `kiln deps`: list the resources that depend on a file.

use crate::pipeline::open_project;
use crate::GlobalArgs;

/// Runs the `kiln deps` command.
///
/// Dependencies come from the persisted index, so only resources compiled
/// by an earlier `kiln build` are listed.
pub fn run(path: &str, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = open_project(global)?;
    let path = path.replace('\\', "/");
    let dependents = project.compiler.dependents(&path);

    if dependents.is_empty() {
        if !global.quiet {
            eprintln!("nothing depends on {path}");
        }
        return Ok(0);
    }
    for dependent in dependents {
        println!("{dependent}");
    }
    Ok(0)
}
