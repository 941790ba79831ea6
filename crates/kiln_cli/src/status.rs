//! `kiln status`: report registered and stale resources.

use kiln_cache::VersionCheck;

use crate::pipeline::open_project;
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `kiln status` command.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = open_project(global)?;
    let compiler = &project.compiler;

    let registered = compiler.registry().len();
    let stale: Vec<String> = compiler.stale_sources().into_iter().collect();
    let rebuilt = matches!(compiler.version_check(), VersionCheck::Rebuilt { .. });

    match args.format {
        ReportFormat::Json => {
            let value = serde_json::json!({
                "project": project.config.project.name,
                "root": project.root.display().to_string(),
                "cache_dir": compiler.store().cache_dir().display().to_string(),
                "registered": registered,
                "stale": stale,
                "cache_rebuilt": rebuilt,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        ReportFormat::Text => {
            if !global.quiet {
                print!("{}", render_text(registered, &stale, rebuilt));
            }
        }
    }
    Ok(0)
}

fn render_text(registered: usize, stale: &[String], rebuilt: bool) -> String {
    let mut out = String::new();
    if rebuilt {
        out.push_str("cache format changed; all artifacts were discarded\n");
    }
    out.push_str(&format!(
        "{registered} resources registered, {} stale\n",
        stale.len()
    ));
    for path in stale {
        out.push_str(&format!("  stale: {path}\n"));
    }
    out
}
