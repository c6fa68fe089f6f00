//! YAML configuration file support for firmclust.
//!
//! Every section is optional and falls back to the crate defaults.
//!
//! ```yaml
//! version: "1.0"
//! name: "vendor dedup"
//!
//! ingest:
//!   max_name_bytes: 4096
//!   reject_duplicate_records: false
//!
//! canonical:
//!   normalize_unicode: true
//!   corporate_suffixes: ["INC", "LLC", "LTD", "CORP", "CORPORATION"]
//!
//! blocking:
//!   k: 2
//!   bands: 8
//!   agreement: 4
//!   use_parallel: true
//!
//! matching:
//!   threshold: 0.85
//!   base_offset: 1000000
//!
//! store:
//!   backend: sqlite
//!   path: "firms.db"
//!
//! logging:
//!   level: "info"
//!   format: json
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use canonical::NormalizerConfig;
use index::BackendConfig;
use ingest::IngestConfig;
use matcher::MatchConfig;
use perceptual::BlockingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error in {section}: {message}")]
    Validation {
        section: &'static str,
        message: String,
    },

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

impl ConfigLoadError {
    fn section<E: fmt::Display>(section: &'static str) -> impl FnOnce(E) -> Self {
        move |err| ConfigLoadError::Validation {
            section,
            message: err.to_string(),
        }
    }
}

/// Log output format of the `firmclust` binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?}; expected text or json")),
        }
    }
}

/// Logging section. `RUST_LOG` and `--log-level` take precedence over
/// `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Top-level YAML configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FirmclustConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub canonical: NormalizerConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub matching: MatchConfig,

    /// Where the pipeline tables live
    #[serde(default)]
    pub store: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FirmclustConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FirmclustConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.ingest
            .validate()
            .map_err(ConfigLoadError::section("ingest"))?;
        self.canonical
            .validate()
            .map_err(ConfigLoadError::section("canonical"))?;
        self.blocking
            .validate()
            .map_err(ConfigLoadError::section("blocking"))?;
        self.matching
            .validate()
            .map_err(ConfigLoadError::section("matching"))?;
        if let BackendConfig::Sqlite { path } = &self.store {
            if path.trim().is_empty() {
                return Err(ConfigLoadError::Validation {
                    section: "store",
                    message: "sqlite path must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    /// Point the store at a SQLite file, overriding the `store` section.
    pub fn with_sqlite<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.store = BackendConfig::sqlite(path.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Set `use_parallel` for both blocking and verification.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.blocking.use_parallel = use_parallel;
        self.matching.use_parallel = use_parallel;
        self
    }
}

impl Default for FirmclustConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestConfig::default(),
            canonical: NormalizerConfig::default(),
            blocking: BlockingConfig::default(),
            matching: MatchConfig::default(),
            store: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
