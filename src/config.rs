//! Configuration module for devstation
//!
//! Tool settings are loaded and merged from several sources, later ones
//! winning:
//! - Default values
//! - User configuration (`<config dir>/devstation/config.toml`, `~/.devstation.toml`)
//! - Project configuration (`./devstation.toml`, `.yaml`, `.yml` or `.json`)
//! - The file named by `DEVSTATION_CONFIG`
//! - Environment variables
//!
//! Command-line flags are applied on top by the CLI. These settings describe
//! how the tool runs; the cloud parameters themselves live in the properties
//! file (see [`crate::parameters`]).

use crate::assembly::{TemplateFormat, DEFAULT_OUTDIR};
use crate::context::DEFAULT_CONTEXT_FILE;
use crate::lint::LintConfig;
use crate::parameters::DEFAULT_PARAMETERS_FILE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default file locations and output format
    pub defaults: Defaults,

    /// Colors and output settings
    pub colors: ColorsConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Template validation settings
    pub lint: LintConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            colors: ColorsConfig::default(),
            logging: LoggingConfig::default(),
            lint: LintConfig::new(),
        }
    }
}

/// Default configuration values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Parameters properties file
    pub parameters: PathBuf,

    /// Context cache file
    pub context: PathBuf,

    /// Cloud assembly output directory
    pub outdir: PathBuf,

    /// Template serialization
    pub format: TemplateFormat,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            parameters: PathBuf::from(DEFAULT_PARAMETERS_FILE),
            context: PathBuf::from(DEFAULT_CONTEXT_FILE),
            outdir: PathBuf::from(DEFAULT_OUTDIR),
            format: TemplateFormat::Json,
        }
    }
}

/// Colors and output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colored output
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when neither `-v` nor `RUST_LOG` is given
    pub log_level: Option<String>,

    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&Path>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.to_path_buf()];
        }

        let mut paths = Vec::new();

        // User config
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("devstation").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".devstation.toml"));
        }

        // Project config (current directory)
        for name in ["devstation.toml", "devstation.yaml", "devstation.yml", "devstation.json"] {
            paths.push(PathBuf::from(name));
        }

        if let Ok(env_config) = std::env::var("DEVSTATION_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; values left at their default do not override
    fn merge(&self, other: Config) -> Config {
        let defaults = Defaults::default();
        let pick = |theirs: PathBuf, ours: &PathBuf, default: &PathBuf| {
            if &theirs != default {
                theirs
            } else {
                ours.clone()
            }
        };

        let mut lint = self.lint.clone();
        for rule in other.lint.skip_rules {
            if !lint.skip_rules.contains(&rule) {
                lint.skip_rules.push(rule);
            }
        }
        if !other.lint.only_rules.is_empty() {
            lint.only_rules = other.lint.only_rules;
        }
        for category in other.lint.skip_categories {
            if !lint.skip_categories.contains(&category) {
                lint.skip_categories.push(category);
            }
        }
        if other.lint.min_severity != LintConfig::new().min_severity {
            lint.min_severity = other.lint.min_severity;
        }
        lint.warnings_as_errors |= other.lint.warnings_as_errors;

        Config {
            defaults: Defaults {
                parameters: pick(other.defaults.parameters, &self.defaults.parameters, &defaults.parameters),
                context: pick(other.defaults.context, &self.defaults.context, &defaults.context),
                outdir: pick(other.defaults.outdir, &self.defaults.outdir, &defaults.outdir),
                format: if other.defaults.format != defaults.format {
                    other.defaults.format
                } else {
                    self.defaults.format
                },
            },
            colors: ColorsConfig {
                enabled: self.colors.enabled && other.colors.enabled,
            },
            logging: LoggingConfig {
                log_level: other.logging.log_level.or_else(|| self.logging.log_level.clone()),
                log_format: if other.logging.log_format != LogFormat::default() {
                    other.logging.log_format
                } else {
                    self.logging.log_format
                },
            },
            lint,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("DEVSTATION_PARAMETERS") {
            self.defaults.parameters = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("DEVSTATION_CONTEXT") {
            self.defaults.context = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("DEVSTATION_OUTDIR") {
            self.defaults.outdir = PathBuf::from(path);
        }

        if let Ok(format) = std::env::var("DEVSTATION_FORMAT") {
            match format.parse() {
                Ok(format) => self.defaults.format = format,
                Err(e) => tracing::warn!("Ignoring DEVSTATION_FORMAT: {}", e),
            }
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("DEVSTATION_NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }

        if let Ok(level) = std::env::var("DEVSTATION_LOG_LEVEL") {
            self.logging.log_level = Some(level);
        }

        if let Ok(format) = std::env::var("DEVSTATION_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.logging.log_format = format,
                Err(e) => tracing::warn!("Ignoring DEVSTATION_LOG_FORMAT: {}", e),
            }
        }
    }

    /// Load from a specific file, without env overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
