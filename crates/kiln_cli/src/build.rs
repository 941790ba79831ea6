//! `kiln build`: compile every stale resource and persist the index.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use kiln_compiler::NullRuntime;

use crate::pipeline::{open_project, parse_timeout};
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// Outcome of a build, for reporting.
#[derive(Debug, Default)]
struct BuildReport {
    queued: usize,
    compiled: usize,
    failed: Vec<String>,
    timed_out: bool,
    elapsed_ms: u128,
}

impl BuildReport {
    fn succeeded(&self) -> bool {
        self.failed.is_empty() && !self.timed_out
    }
}

/// Runs the `kiln build` command.
///
/// Returns exit code 0 when every queued resource compiled, 1 otherwise.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let timeout = parse_timeout(&args.timeout)?;
    let project = open_project(global)?;
    let compiler = &project.compiler;

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!("   Compiling {}", project.config.project.name);
    }

    let outcomes: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    compiler.on_resource_compiled(Box::new(move |path, ok| {
        if let Ok(mut outcomes) = sink.lock() {
            outcomes.push((path.to_string(), ok));
        }
    }));

    let started = Instant::now();
    let queued = if args.force {
        compiler.queue_all()
    } else {
        compiler.queue_stale()
    };
    let finished = compiler.run_until_idle(&NullRuntime, timeout);
    compiler.save_index()?;

    let outcomes = outcomes.lock().map(|o| o.clone()).unwrap_or_default();
    let mut failed: Vec<String> = outcomes
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(path, _)| path.clone())
        .collect();
    failed.sort();
    let report = BuildReport {
        queued,
        compiled: outcomes.iter().filter(|(_, ok)| *ok).count(),
        failed,
        timed_out: !finished,
        elapsed_ms: started.elapsed().as_millis(),
    };

    match args.format {
        ReportFormat::Json => println!("{}", render_json(&report)),
        ReportFormat::Text => {
            if global.verbose {
                for (path, _) in outcomes.iter().filter(|(_, ok)| *ok) {
                    eprintln!("    Compiled {path}");
                }
            }
            if !global.quiet || !report.succeeded() {
                eprint!("{}", render_text(&report));
            }
        }
    }
    Ok(if report.succeeded() { 0 } else { 1 })
}

fn render_text(report: &BuildReport) -> String {
    let mut out = String::new();
    for path in &report.failed {
        out.push_str(&format!("error: failed to compile {path}\n"));
    }
    if report.timed_out {
        out.push_str("error: timed out waiting for compiles\n");
    }
    if report.queued == 0 {
        out.push_str("    Finished nothing to compile\n");
    } else {
        out.push_str(&format!(
            "    Finished {} compiled, {} failed in {:.2}s\n",
            report.compiled,
            report.failed.len(),
            report.elapsed_ms as f64 / 1000.0
        ));
    }
    out
}

fn render_json(report: &BuildReport) -> String {
    let value = serde_json::json!({
        "queued": report.queued,
        "compiled": report.compiled,
        "failed": report.failed,
        "timed_out": report.timed_out,
        "elapsed_ms": report.elapsed_ms as u64,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}
