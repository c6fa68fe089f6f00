use ingest::NameId;
use perceptual::CandidatePair;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Firm identifier. Grouped firms use `0..C`; singleton firms use
/// `name_id + base_offset`.
pub type FirmId = u64;

/// Tuning knobs for verification and firm assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// A pair is kept when its similarity is strictly greater than this.
    pub threshold: f64,
    /// Offset added to the name id of every singleton firm. Must exceed the
    /// number of grouped firms so the two id ranges never meet.
    pub base_offset: u64,
    /// Normalize and score on the rayon pool.
    pub use_parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            base_offset: 1_000_000,
            use_parallel: false,
        }
    }
}

impl MatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_base_offset(mut self, base_offset: u64) -> Self {
        self.base_offset = base_offset;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(MatchError::InvalidConfig(format!(
                "threshold must be within 0.0..=1.0 (got {})",
                self.threshold
            )));
        }
        if self.base_offset == 0 {
            return Err(MatchError::InvalidConfig(
                "base_offset must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// A candidate pair together with the weak-normalized texts of both names,
/// as stored in the `pair` table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamedPair {
    pub pair: CandidatePair,
    pub name1: String,
    pub name2: String,
}

/// A candidate pair whose similarity exceeded the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEdge {
    pub pair: CandidatePair,
    pub score: f64,
}

/// One row of the `match` or `firm` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FirmAssignment {
    pub firm_num: FirmId,
    pub id: NameId,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),

    /// Singleton ids would collide with grouped firm ids.
    #[error("base_offset {base_offset} must exceed the number of grouped firms ({components})")]
    OffsetTooSmall { base_offset: u64, components: usize },

    /// The same name id arrived with two different texts.
    #[error("name {id} appears with conflicting texts {first:?} and {second:?}")]
    InconsistentName {
        id: NameId,
        first: String,
        second: String,
    },

    /// A grouped membership row refers to a name that is not in the name table.
    #[error("match row refers to unknown name id {id}")]
    UnknownName { id: NameId },

    /// A name was assigned to two grouped firms.
    #[error("name {id} belongs to grouped firms {first} and {second}")]
    ConflictingFirm {
        id: NameId,
        first: FirmId,
        second: FirmId,
    },

    /// A grouped firm id lies in the singleton range.
    #[error("grouped firm id {firm_num} is not below base_offset {base_offset}")]
    GroupedIdOutOfRange { firm_num: FirmId, base_offset: u64 },

    #[error("firm id overflow for name {id} with base_offset {base_offset}")]
    FirmIdOverflow { id: NameId, base_offset: u64 },
}
