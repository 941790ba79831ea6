//! Kiln CLI: the command-line interface for the Kiln asset compiler.
//!
//! Provides `kiln build` for compiling stale resources, `kiln status` for
//! reporting what would be compiled, `kiln clean` for dropping the artifact
//! cache, and `kiln deps` for querying the dependency graph.

#![warn(missing_docs)]

mod build;
mod clean;
mod deps;
mod pipeline;
mod status;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Kiln: an incremental asset compiler.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln Asset Compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `kiln.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile every stale resource in the project.
    Build(BuildArgs),
    /// Report registered and stale resources without compiling.
    Status(StatusArgs),
    /// Delete every compiled artifact and the registry index.
    Clean,
    /// List the resources that depend on a file.
    Deps {
        /// Path relative to the source root (e.g., `shaders/common.glsl`).
        path: String,
    },
}

/// Arguments for the `kiln build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Recompile every resource, fresh or not.
    #[arg(short, long)]
    pub force: bool,

    /// Give up if compilation has not finished after this long (e.g., "90s", "5m").
    #[arg(long, default_value = "5m")]
    pub timeout: String,

    /// Output format for the build report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Status(ref args) => status::run(args, &global),
        Command::Clean => clean::run(&global),
        Command::Deps { ref path } => deps::run(path, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the level picked from the flags.
fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level_filter(level)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn level_filter(level: &str) -> String {
    format!("kiln_cli={level},kiln_compiler={level},kiln_cache={level}")
}
