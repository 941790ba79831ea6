//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::KilnConfig;
use std::collections::HashMap;
use std::path::Path;

/// Name of the configuration file in a project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Longest extension accepted by the extension lookup table, in bytes.
pub const MAX_EXTENSION_LEN: usize = 8;

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// Reads `<project_dir>/kiln.toml`, parses it, and validates it.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates required fields and the resource-type extension table.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.cache.dir.is_empty() {
        return Err(ConfigError::MissingField("cache.dir".to_string()));
    }

    let mut owners: HashMap<String, &str> = HashMap::new();
    for (type_name, type_config) in &config.types {
        if type_config.extensions.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "types.{type_name}.extensions"
            )));
        }
        for ext in &type_config.extensions {
            validate_extension(type_name, ext)?;
            let key = ext.to_ascii_lowercase();
            if let Some(previous) = owners.insert(key, type_name) {
                return Err(ConfigError::DuplicateExtension {
                    ext: ext.clone(),
                    first: previous.to_string(),
                    second: type_name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_extension(type_name: &str, ext: &str) -> Result<(), ConfigError> {
    let reason = if ext.is_empty() {
        "extension is empty".to_string()
    } else if ext.starts_with('.') {
        "expected a bare extension such as \"png\"".to_string()
    } else if !ext.is_ascii() || ext.len() > MAX_EXTENSION_LEN {
        format!("must be at most {MAX_EXTENSION_LEN} ASCII characters")
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidExtension {
        type_name: type_name.to_string(),
        ext: ext.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompilerKind;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "demo"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.source_root, ".");
        assert_eq!(config.cache.dir, ".kiln/resources");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "demo"
source_root = "assets"

[cache]
dir = "build/cache"
compression_threshold = 1024

[compiler]
workers = 4
jobs_per_tick = 8

[watch]
ignore = ["kiln.log"]

[types.texture]
extensions = ["png", "tga"]

[types.shader]
extensions = "glsl"
compiler = "none"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.source_root, "assets");
        assert_eq!(config.cache.dir, "build/cache");
        assert_eq!(config.cache.compression_threshold, 1024);
        assert_eq!(config.compiler.workers, 4);
        assert_eq!(config.compiler.jobs_per_tick, 8);
        assert_eq!(config.watch.ignore, vec!["kiln.log"]);
        assert_eq!(config.types["texture"].extensions, vec!["png", "tga"]);
        assert_eq!(config.types["shader"].compiler, CompilerKind::None);
    }

    #[test]
    fn missing_name_errors() {
        let err = load_config_from_str("[project]\nname = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_project_section_errors() {
        let err = load_config_from_str("[cache]\ndir = \"c\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn duplicate_extension_errors() {
        let toml = r#"
[project]
name = "demo"

[types.texture]
extensions = ["png"]

[types.image]
extensions = ["PNG"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateExtension { .. }));
        assert!(err.to_string().contains("'image' and 'texture'"));
    }

    #[test]
    fn overlong_extension_errors() {
        let toml = r#"
[project]
name = "demo"

[types.blob]
extensions = ["verylongext"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExtension { .. }));
    }

    #[test]
    fn dotted_extension_errors() {
        let toml = r#"
[project]
name = "demo"

[types.texture]
extensions = [".png"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("bare extension"));
    }

    #[test]
    fn empty_extension_list_errors() {
        let toml = r#"
[project]
name = "demo"

[types.texture]
extensions = []
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"disk\"\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "disk");
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
