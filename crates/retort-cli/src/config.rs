//! Configuration management for the CLI
//!
//! Settings are layered, later layers taking precedence:
//! - Default values
//! - A configuration file (TOML, YAML or JSON)
//! - Environment variables
//! - Command-line arguments

use crate::cli::EngineArgs;
use crate::error::{Error, Result};
use retort_core::{DebugTrail, RetortConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retort settings
    pub engine: RetortConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use colored output by default
    pub color: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Serialization format of a data file, picked by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
    Toml,
}

impl FileFormat {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }

    /// Parse `content` into any deserializable value
    pub fn parse<T: serde::de::DeserializeOwned>(self, content: &str) -> Result<T> {
        Ok(match self {
            FileFormat::Json => serde_json::from_str(content)?,
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Toml => toml::from_str(content)?,
        })
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        FileFormat::of(path).parse(&content)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "Loaded configuration");
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations,
    /// then apply environment overrides
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::load()?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("retort.toml"),
            PathBuf::from(".retort.toml"),
            PathBuf::from("retort.yaml"),
            PathBuf::from("retort.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let retort_dir = config_dir.join("retort");
            paths.push(retort_dir.join("config.toml"));
            paths.push(retort_dir.join("config.yaml"));
            paths.push(retort_dir.join("config.json"));
        }

        paths
    }

    /// Apply `RETORT_STRICT_COERCION` and `RETORT_DEBUG_TRAIL`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(strict) = var("RETORT_STRICT_COERCION") {
            self.engine.strict_coercion = match strict.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(Error::config(format!(
                        "RETORT_STRICT_COERCION must be a boolean, got {:?}",
                        other
                    )))
                }
            };
        }
        if let Some(mode) = var("RETORT_DEBUG_TRAIL") {
            self.engine.debug_trail = mode.parse::<DebugTrail>().map_err(Error::config)?;
        }
        Ok(())
    }

    /// Retort settings after command-line overrides
    pub fn retort_config(&self, args: &EngineArgs) -> RetortConfig {
        let mut config = self.engine;
        if args.lax {
            config = config.strict_coercion(false);
        }
        if let Some(mode) = args.debug_trail {
            config = config.debug_trail(mode.into());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DebugTrailArg;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_toml_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[engine]\nstrict_coercion = false\n\n[logging]\nformat = \"json\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(!config.engine.strict_coercion);
        assert_eq!(config.engine.debug_trail, DebugTrail::All);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert!(config.output.color);
    }

    #[test]
    fn test_yaml_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "engine:\n  debug_trail: first").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(config.engine.strict_coercion);
        assert_eq!(config.engine.debug_trail, DebugTrail::First);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/retort.toml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("RETORT_STRICT_COERCION", "false"), ("RETORT_DEBUG_TRAIL", "disable")].into();
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert!(!config.engine.strict_coercion);
        assert_eq!(config.engine.debug_trail, DebugTrail::Disable);

        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == "RETORT_STRICT_COERCION").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_flags_win() {
        let config = Config::default();
        let args = EngineArgs {
            lax: true,
            debug_trail: Some(DebugTrailArg::First),
        };
        let engine = config.retort_config(&args);
        assert!(!engine.strict_coercion);
        assert_eq!(engine.debug_trail, DebugTrail::First);
        assert_eq!(config.retort_config(&EngineArgs::default()), RetortConfig::default());
    }
}
