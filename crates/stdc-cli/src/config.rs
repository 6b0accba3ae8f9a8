//! Layered configuration for the `stdc` binary.
//!
//! Values are resolved lowest precedence first: built-in defaults, a `.toml`
//! or `.json` file, `STDC_*` environment variables, then command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stdc_dtype::ConversionTarget;
use stdc_format::pipeline::same_path;
use stdc_format::{ConvertOptions, DEFAULT_OUTPUT, OutputMode};

pub const ENV_TARGET: &str = "STDC_TARGET";
pub const ENV_OUTPUT: &str = "STDC_OUTPUT";
pub const ENV_REPLACE: &str = "STDC_REPLACE";
pub const ENV_LOG_LEVEL: &str = "STDC_LOG_LEVEL";

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Errors that can occur when loading or validating a [`CliConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config file {}: expected a .toml or .json extension", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Settings for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub target: ConversionTarget,
    pub output: PathBuf,
    pub replace: bool,
    pub log_level: String,
    /// Where to write the JSON conversion report, if anywhere.
    pub report: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            target: ConversionTarget::F32,
            output: PathBuf::from(DEFAULT_OUTPUT),
            replace: false,
            log_level: "info".to_string(),
            report: None,
        }
    }
}

/// Values given on the command line. `None`/`false` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<ConversionTarget>,
    pub output: Option<PathBuf>,
    pub replace: bool,
    pub verbose: bool,
    pub report: Option<PathBuf>,
}

impl CliConfig {
    /// Defaults, or `path` when given, with environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Read a config file, choosing the parser by extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(path)?)?),
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Apply `STDC_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var(ENV_TARGET) {
            self.target = val.parse::<ConversionTarget>().map_err(|e| ConfigError::EnvOverride {
                key: ENV_TARGET.into(),
                value: val.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Ok(val) = std::env::var(ENV_OUTPUT) {
            self.output = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(ENV_REPLACE) {
            self.replace = parse_flag(&val).ok_or_else(|| ConfigError::EnvOverride {
                key: ENV_REPLACE.into(),
                value: val.clone(),
                reason: "expected true/false, yes/no, on/off or 1/0".into(),
            })?;
        }

        if let Ok(val) = std::env::var(ENV_LOG_LEVEL) {
            self.log_level = val;
        }

        Ok(())
    }

    /// Apply command-line values on top of everything else.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(target) = overrides.target {
            self.target = target;
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
        if overrides.replace {
            self.replace = true;
        }
        if overrides.verbose {
            self.log_level = "debug".to_string();
        }
        if overrides.report.is_some() {
            self.report = overrides.report;
        }
    }

    /// Check the resolved settings against the input they will be used with.
    pub fn validate(&self, input: &Path) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown log level {:?}, expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if !self.replace && same_path(input, &self.output) {
            return Err(ConfigError::Validation(format!(
                "input and output are the same file ({}); pass --replace to rewrite it in place",
                input.display()
            )));
        }
        if self.report.as_deref().is_some_and(|report| same_path(report, &self.destination(input))) {
            return Err(ConfigError::Validation(
                "report path must differ from the converted file".into(),
            ));
        }
        Ok(())
    }

    /// Options handed to the converter.
    pub fn convert_options(&self) -> ConvertOptions {
        let output = if self.replace {
            OutputMode::Replace
        } else {
            OutputMode::File(self.output.clone())
        };
        ConvertOptions { target: self.target, output }
    }

    fn destination(&self, input: &Path) -> PathBuf {
        if self.replace { input.to_path_buf() } else { self.output.clone() }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
