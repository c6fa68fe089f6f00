//! Workspace umbrella crate for firmclust, the firm-name deduplication
//! pipeline.
//!
//! The four stages run in order, each reading the previous stage's table
//! from a [`TableStore`] and fully replacing its own:
//!
//! 1. `unique_names`: raw records → `name` + `record_name`
//! 2. `filter_pairs`: `name` → `pair` (weighted MinHash LSH blocking)
//! 3. `find_groups`: `pair` → `match` (bounded edit-distance verification
//!    and connected components)
//! 4. `merge_firms`: `name` + `match` → `firm` + `record_firm`
//!
//! ```
//! use firmclust::{Pipeline, RawNameRecord};
//!
//! let pipeline = Pipeline::in_memory();
//! let report = pipeline
//!     .run(vec![
//!         RawNameRecord::new("docs", "1", "Acme Corp"),
//!         RawNameRecord::new("docs", "2", "ACME CORPORATION"),
//!         RawNameRecord::new("docs", "3", "Zenith LLC"),
//!     ])
//!     .unwrap();
//! assert_eq!(report.firms.grouped_firms, 1);
//! assert_eq!(report.firms.singletons, 1);
//! ```

pub mod config;
pub mod input;
mod pipeline;

pub use canonical::{
    CanonicalError, FirmNormalizer, Normalizer, NormalizerConfig, collapse_whitespace,
};
pub use index::{
    BackendConfig, GroupMember, InMemoryStore, IndexError, RecordFirm, SqliteStore, Table,
    TableStore,
};
pub use ingest::{
    IngestConfig, IngestError, IngestStats, NameEntry, NameId, RawNameRecord, RecordLink,
};
pub use matcher::{FirmAssignment, FirmId, MatchConfig, MatchError, NamedPair, VerifyStats};
pub use perceptual::{BlockingConfig, BlockingStats, CandidatePair, PerceptualError};

pub use crate::config::{ConfigLoadError, FirmclustConfig, LogFormat, LoggingConfig};
pub use crate::pipeline::{
    FirmSummary, GroupSummary, NameSummary, Pipeline, RunReport, project_records,
};

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The four pipeline stages, named as they appear in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    UniqueNames,
    FilterPairs,
    FindGroups,
    MergeFirms,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::UniqueNames,
        Stage::FilterPairs,
        Stage::FindGroups,
        Stage::MergeFirms,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::UniqueNames => "unique_names",
            Stage::FilterPairs => "filter_pairs",
            Stage::FindGroups => "find_groups",
            Stage::MergeFirms => "merge_firms",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while running a pipeline stage. Every variant names the
/// stage it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Raw records were rejected while building the name table.
    UniqueNames(IngestError),
    /// The blocking configuration was rejected.
    FilterPairs(PerceptualError),
    /// Verification or component numbering failed.
    FindGroups(MatchError),
    /// The grouped rows could not be merged into a total firm mapping.
    MergeFirms(MatchError),
    /// The table store failed while the stage read or wrote a table.
    Store { stage: Stage, source: IndexError },
    /// A row refers to a name id that the `name` table does not hold.
    DanglingName { stage: Stage, table: Table, id: NameId },
    /// The normalizer could not be built from its configuration.
    Normalizer(CanonicalError),
    /// The configured table store could not be opened.
    OpenStore(IndexError),
}

impl PipelineError {
    /// Stage that raised the error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::UniqueNames(_) => Some(Stage::UniqueNames),
            PipelineError::FilterPairs(_) => Some(Stage::FilterPairs),
            PipelineError::FindGroups(_) => Some(Stage::FindGroups),
            PipelineError::MergeFirms(_) => Some(Stage::MergeFirms),
            PipelineError::Store { stage, .. } | PipelineError::DanglingName { stage, .. } => {
                Some(*stage)
            }
            PipelineError::Normalizer(_) | PipelineError::OpenStore(_) => None,
        }
    }

    pub(crate) fn store(stage: Stage) -> impl FnOnce(IndexError) -> PipelineError {
        move |source| PipelineError::Store { stage, source }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::UniqueNames(err) => write!(f, "unique_names failed: {err}"),
            PipelineError::FilterPairs(err) => write!(f, "filter_pairs failed: {err}"),
            PipelineError::FindGroups(err) => write!(f, "find_groups failed: {err}"),
            PipelineError::MergeFirms(err) => write!(f, "merge_firms failed: {err}"),
            PipelineError::Store { stage, source } => {
                write!(f, "{stage} failed in the table store: {source}")
            }
            PipelineError::DanglingName { stage, table, id } => {
                write!(f, "{stage} failed: table {table} refers to unknown name id {id}")
            }
            PipelineError::Normalizer(err) => write!(f, "normalizer setup failed: {err}"),
            PipelineError::OpenStore(err) => write!(f, "could not open table store: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::UniqueNames(err) => Some(err),
            PipelineError::FilterPairs(err) => Some(err),
            PipelineError::FindGroups(err) | PipelineError::MergeFirms(err) => Some(err),
            PipelineError::Store { source, .. } => Some(source),
            PipelineError::Normalizer(err) => Some(err),
            PipelineError::OpenStore(err) => Some(err),
            PipelineError::DanglingName { .. } => None,
        }
    }
}

impl From<IngestError> for PipelineError {
    fn from(value: IngestError) -> Self {
        PipelineError::UniqueNames(value)
    }
}

impl From<PerceptualError> for PipelineError {
    fn from(value: PerceptualError) -> Self {
        PipelineError::FilterPairs(value)
    }
}

impl From<CanonicalError> for PipelineError {
    fn from(value: CanonicalError) -> Self {
        PipelineError::Normalizer(value)
    }
}

/// Metrics observer for pipeline stages.
///
/// Handed to a [`Pipeline`] with [`Pipeline::with_metrics`]; `rows` is the
/// number of rows the stage wrote.
pub trait PipelineMetrics: Send + Sync {
    fn record_stage(&self, stage: Stage, latency: Duration, result: Result<usize, PipelineError>);
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    stage: Stage,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start(recorder: Option<&Arc<dyn PipelineMetrics>>, stage: Stage) -> Option<Self> {
        recorder.map(|recorder| Self {
            recorder: Arc::clone(recorder),
            stage,
            start: Instant::now(),
        })
    }

    pub(crate) fn finish<T>(self, result: &Result<T, PipelineError>, rows: impl FnOnce(&T) -> usize) {
        let outcome = match result {
            Ok(value) => Ok(rows(value)),
            Err(err) => Err(err.clone()),
        };
        self.recorder
            .record_stage(self.stage, self.start.elapsed(), outcome);
    }
}
