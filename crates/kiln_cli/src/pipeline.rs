//! Shared helpers for CLI commands.
//!
//! Project root resolution, opening the compiler from `kiln.toml`, and
//! timeout parsing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_compiler::{AssetCompiler, CompilerSettings};
use kiln_config::{KilnConfig, CONFIG_FILE};

use crate::GlobalArgs;

/// A loaded project with an initialised compiler.
pub struct Project {
    /// Directory containing `kiln.toml`.
    pub root: PathBuf,
    /// The parsed configuration.
    pub config: KilnConfig,
    /// Compiler with every configured type registered and start-up finished.
    pub compiler: AssetCompiler,
}

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `kiln.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Loads `kiln.toml` and returns its directory and contents.
pub fn load_project_config(
    global: &GlobalArgs,
) -> Result<(PathBuf, KilnConfig), Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let config = kiln_config::load_config(&root)?;
    Ok((root, config))
}

/// Opens the project's compiler, registers the configured types and runs
/// the start-up scan.
pub fn open_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let (root, config) = load_project_config(global)?;
    let compiler = AssetCompiler::open(CompilerSettings::from_config(&root, &config))?;
    compiler.configure_types(&config.types)?;
    compiler.finish_init();
    Ok(Project {
        root,
        config,
        compiler,
    })
}

/// Parses a human-readable duration such as `"30s"`, `"500ms"` or `"2m"`.
///
/// A bare number is taken as seconds.
pub fn parse_timeout(s: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return Err(format!("invalid timeout '{s}': expected a number").into());
    }
    let value: u64 = digits.parse()?;
    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("invalid timeout '{s}': too large").into()),
        other => Err(format!("invalid timeout unit '{other}' (expected ms, s or m)").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // -- find_project_root tests --

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kiln.toml"), "[project]\nname=\"t\"").unwrap();
        let root = find_project_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kiln.toml"), "[project]\nname=\"t\"").unwrap();
        let sub = tmp.path().join("textures");
        fs::create_dir_all(&sub).unwrap();
        let root = find_project_root(&sub).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = find_project_root(tmp.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("could not find kiln.toml"));
    }

    #[test]
    fn resolve_from_config_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("kiln.toml");
        fs::write(&file, "[project]\nname=\"t\"").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(file.to_string_lossy().into_owned()),
        };
        assert_eq!(resolve_project_root(&global).unwrap(), tmp.path());
    }

    #[test]
    fn open_project_registers_configured_types() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("kiln.toml"),
            "[project]\nname=\"t\"\n[types.texture]\nextensions=[\"png\"]\n",
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("tex")).unwrap();
        fs::write(tmp.path().join("tex/a.png"), b"px").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(tmp.path().to_string_lossy().into_owned()),
        };
        let project = open_project(&global).unwrap();
        assert_eq!(project.config.project.name, "t");
        assert_eq!(project.compiler.registry().paths(), vec!["tex/a.png"]);
    }

    // -- parse_timeout tests --

    #[test]
    fn parse_timeout_units() {
        assert_eq!(parse_timeout("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn parse_timeout_rejects_garbage() {
        assert!(parse_timeout("fast").is_err());
        assert!(parse_timeout("10h").is_err());
        assert!(parse_timeout("").is_err());
    }

    #[test]
    fn parse_timeout_rejects_overflow() {
        assert!(parse_timeout(&format!("{}m", u64::MAX)).is_err());
        assert!(parse_timeout("99999999999999999999s").is_err());
        assert_eq!(
            parse_timeout(&format!("{}s", u64::MAX)).unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }
}
