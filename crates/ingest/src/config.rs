//! Configuration for building the unique-name table.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let cfg = IngestConfig::default().with_max_name_bytes(Some(512));
//! cfg.validate().expect("valid config");
//! ```
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Runtime configuration for [`unique_names`](crate::unique_names).
///
/// All fields have defaults, so partial YAML or JSON documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Configuration version, bumped when filtering semantics change.
    pub version: u32,

    /// Treat control characters in `source` and `record_id` as blank when
    /// checking them for emptiness. The stored keys are never rewritten.
    pub strip_control_chars: bool,

    /// Raw names longer than this many bytes are filtered before
    /// normalization and counted as oversized. `None` (the default) keeps
    /// every name.
    ///
    /// Extraction from scanned documents occasionally yields whole paragraphs
    /// in the name field; setting a limit drops them, at the cost of leaving
    /// their records without a firm.
    pub max_name_bytes: Option<usize>,

    /// Reject a repeated `(source, record_id)` key instead of keeping the
    /// first occurrence.
    pub reject_duplicate_records: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: 1,
            strip_control_chars: true,
            max_name_bytes: None,
            reject_duplicate_records: false,
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strip_control_chars(mut self, enabled: bool) -> Self {
        self.strip_control_chars = enabled;
        self
    }

    pub fn with_max_name_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_name_bytes = limit;
        self
    }

    pub fn with_reject_duplicate_records(mut self, enabled: bool) -> Self {
        self.reject_duplicate_records = enabled;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - `version` is 0
    /// - `max_name_bytes` is `Some(0)`, which would filter every name
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.version == 0 {
            return Err(IngestError::InvalidConfig("version must be >= 1".into()));
        }
        if self.max_name_bytes == Some(0) {
            return Err(IngestError::InvalidConfig(
                "max_name_bytes must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}
