//! Configuration: `numdev.toml` merged with CLI flags.
//!
//! Every key is optional in the file; the CLI wins where both are given.
//! Unknown keys warn instead of failing, so a config written for a newer
//! version still loads.

use owo_colors::OwoColorize;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::cli::{Cli, Commands};

/// Fallback interpreter executable.
const DEFAULT_INTERPRETER: &str = "python";
/// Fallback WebSocket event port.
const DEFAULT_PORT: u16 = 7211;
/// Fallback watcher debounce window.
const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

// ============================================================================
// File model
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    app: AppSection,
    dev: DevSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppSection {
    module_path: Option<PathBuf>,
    class_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DevSection {
    interpreter: Option<String>,
    port: Option<u16>,
    debounce_ms: Option<u64>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Fully resolved dev-loop configuration.
#[derive(Debug, Clone)]
pub struct DevConfig {
    /// The app module to watch and introspect.
    pub module_path: PathBuf,
    /// The app class inside the module.
    pub class_name: String,
    /// Interpreter executable used for both introspection and runtime.
    pub interpreter: String,
    /// WebSocket event port.
    pub port: u16,
    /// Watcher debounce window in milliseconds.
    pub debounce_ms: u64,
}

impl DevConfig {
    /// Resolve configuration from the config file and CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = if cli.config.exists() {
            load_file(&cli.config)?
        } else {
            ConfigFile::default()
        };

        let (spec, cli_port, cli_interpreter) = match &cli.command {
            Commands::Dev {
                spec,
                port,
                interpreter,
            } => (spec.as_deref(), *port, interpreter.as_deref()),
            Commands::Read { spec, interpreter } => (spec.as_deref(), None, interpreter.as_deref()),
        };

        let (spec_module, spec_class) = match spec {
            Some(spec) => {
                let (module, class) = parse_spec(spec)?;
                (Some(module), Some(class))
            }
            None => (None, None),
        };

        let module_path = spec_module
            .or(file.app.module_path)
            .ok_or_else(|| missing("app.module_path", "app.py:MyApp"))?;
        let class_name = spec_class
            .or(file.app.class_name)
            .ok_or_else(|| missing("app.class_name", "app.py:MyApp"))?;

        Ok(Self {
            module_path,
            class_name,
            interpreter: cli_interpreter
                .map(str::to_owned)
                .or(file.dev.interpreter)
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            port: cli_port.or(file.dev.port).unwrap_or(DEFAULT_PORT),
            debounce_ms: file.dev.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
        })
    }
}

fn missing(field: &str, example: &str) -> ConfigError {
    ConfigError::Validation(format!(
        "`{}` is not set; pass the app as {} or add it to numdev.toml",
        field.cyan(),
        example.cyan(),
    ))
}

/// Parse an `app.py:MyApp` spec into module path and class name.
fn parse_spec(spec: &str) -> Result<(PathBuf, String), ConfigError> {
    match spec.rsplit_once(':') {
        Some((module, class)) if !module.is_empty() && !class.is_empty() => {
            Ok((PathBuf::from(module), class.to_string()))
        }
        _ => Err(ConfigError::Validation(format!(
            "invalid app spec `{spec}`, expected {}",
            "MODULE_PATH:CLASS_NAME".cyan()
        ))),
    }
}

/// Load the config file, warning on unknown keys instead of failing.
fn load_file(path: &PathBuf) -> Result<ConfigFile, ConfigError> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.clone(), e))?;

    let deserializer = toml::de::Deserializer::new(&raw);
    let file: ConfigFile = serde_ignored::deserialize(deserializer, |unknown| {
        crate::log!("warning"; "unknown config key `{}` in {}", unknown, path.display());
    })?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_for(config: PathBuf, spec: Option<&str>, port: Option<u16>) -> Cli {
        Cli {
            color: clap::ColorChoice::Auto,
            verbose: false,
            config,
            command: Commands::Dev {
                spec: spec.map(str::to_owned),
                port,
                interpreter: None,
            },
        }
    }

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numdev.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_spec() {
        let (module, class) = parse_spec("app.py:MyApp").unwrap();
        assert_eq!(module, PathBuf::from("app.py"));
        assert_eq!(class, "MyApp");

        // path may contain separators; the class is after the last colon
        let (module, class) = parse_spec("apps/demo.py:Demo").unwrap();
        assert_eq!(module, PathBuf::from("apps/demo.py"));
        assert_eq!(class, "Demo");
    }

    #[test]
    fn test_parse_spec_invalid() {
        assert!(parse_spec("app.py").is_err());
        assert!(parse_spec(":MyApp").is_err());
        assert!(parse_spec("app.py:").is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let config = DevConfig::load(&cli_for(
            PathBuf::from("does-not-exist.toml"),
            Some("app.py:Demo"),
            None,
        ))
        .unwrap();

        assert_eq!(config.interpreter, DEFAULT_INTERPRETER);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_file_values_used() {
        let (_dir, path) = write_config(
            r#"
            [app]
            module_path = "app.py"
            class_name = "Demo"

            [dev]
            interpreter = "python3"
            port = 9000
            debounce_ms = 150
            "#,
        );

        let config = DevConfig::load(&cli_for(path, None, None)).unwrap();
        assert_eq!(config.module_path, PathBuf::from("app.py"));
        assert_eq!(config.class_name, "Demo");
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.port, 9000);
        assert_eq!(config.debounce_ms, 150);
    }

    #[test]
    fn test_cli_overrides_file() {
        let (_dir, path) = write_config(
            r#"
            [app]
            module_path = "app.py"
            class_name = "Demo"

            [dev]
            port = 9000
            "#,
        );

        let config =
            DevConfig::load(&cli_for(path, Some("other.py:Other"), Some(7000))).unwrap();
        assert_eq!(config.module_path, PathBuf::from("other.py"));
        assert_eq!(config.class_name, "Other");
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_missing_app_spec_is_error() {
        let err = DevConfig::load(&cli_for(PathBuf::from("nope.toml"), None, None)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_unknown_keys_warn_not_fail() {
        let (_dir, path) = write_config(
            r#"
            [app]
            module_path = "app.py"
            class_name = "Demo"
            flavour = "vanilla"

            [experimental]
            shiny = true
            "#,
        );
        assert!(DevConfig::load(&cli_for(path, None, None)).is_ok());
    }
}
