use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use canonical::{FirmNormalizer, Normalizer};
use index::{GroupMember, InMemoryStore, RecordFirm, Table, TableStore};
use ingest::{IngestConfig, IngestStats, NameId, RawNameRecord, RecordLink};
use matcher::{FirmAssignment, FirmId, MatchConfig, NamedPair};
use perceptual::{BlockingConfig, BlockingStats};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::FirmclustConfig;
use crate::{MetricsSpan, PipelineError, PipelineMetrics, Stage};

/// Outcome of the `unique_names` stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NameSummary {
    /// Rows written to the `name` table.
    pub names: usize,
    pub stats: IngestStats,
}

/// Outcome of the `find_groups` stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub candidates: usize,
    pub verified: usize,
    /// Grouped firms, i.e. components with at least two names.
    pub components: usize,
    /// Rows written to the `match` table.
    pub grouped_names: usize,
    pub largest: usize,
}

/// Outcome of the `merge_firms` stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FirmSummary {
    /// Rows written to the `firm` table; one per name.
    pub names: usize,
    pub grouped_firms: usize,
    pub singletons: usize,
    /// Rows written to the `record_firm` table.
    pub records: usize,
}

/// Summaries of all four stages of one [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub names: NameSummary,
    pub pairs: BlockingStats,
    pub groups: GroupSummary,
    pub firms: FirmSummary,
}

/// Runs the pipeline stages against one table store.
///
/// Each stage reads its input from the store and replaces its own tables, so
/// stages can be rerun on their own once the earlier tables exist. A failed
/// stage leaves every table it did not finish writing untouched.
pub struct Pipeline {
    ingest: IngestConfig,
    blocking: BlockingConfig,
    matching: MatchConfig,
    normalizer: Arc<dyn Normalizer>,
    store: Box<dyn TableStore>,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl Pipeline {
    /// Default configuration and [`FirmNormalizer`] over `store`.
    pub fn new(store: Box<dyn TableStore>) -> Self {
        Self {
            ingest: IngestConfig::default(),
            blocking: BlockingConfig::default(),
            matching: MatchConfig::default(),
            normalizer: Arc::new(FirmNormalizer::default()),
            store,
            metrics: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryStore::new()))
    }

    /// Builds the normalizer and opens the store named by `cfg`.
    pub fn from_config(cfg: &FirmclustConfig) -> Result<Self, PipelineError> {
        let normalizer = FirmNormalizer::new(cfg.canonical.clone())?;
        let store = cfg.store.build().map_err(PipelineError::OpenStore)?;
        Ok(Self::new(store)
            .with_normalizer(normalizer)
            .with_ingest_config(cfg.ingest.clone())
            .with_blocking_config(cfg.blocking.clone())
            .with_match_config(cfg.matching.clone()))
    }

    pub fn with_normalizer<N: Normalizer + 'static>(mut self, normalizer: N) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn with_ingest_config(mut self, cfg: IngestConfig) -> Self {
        self.ingest = cfg;
        self
    }

    pub fn with_blocking_config(mut self, cfg: BlockingConfig) -> Self {
        self.blocking = cfg;
        self
    }

    pub fn with_match_config(mut self, cfg: MatchConfig) -> Self {
        self.matching = cfg;
        self
    }

    pub fn with_metrics(mut self, recorder: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    pub fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }

    pub fn match_config(&self) -> &MatchConfig {
        &self.matching
    }

    /// Runs all four stages in order.
    pub fn run<I>(&self, records: I) -> Result<RunReport, PipelineError>
    where
        I: IntoIterator<Item = RawNameRecord>,
    {
        let names = self.unique_names(records)?;
        let pairs = self.filter_pairs()?;
        let groups = self.find_groups()?;
        let firms = self.merge_firms()?;
        Ok(RunReport {
            names,
            pairs,
            groups,
            firms,
        })
    }

    /// Stage 1: filters and deduplicates raw names, replacing `name` and
    /// `record_name`.
    pub fn unique_names<I>(&self, records: I) -> Result<NameSummary, PipelineError>
    where
        I: IntoIterator<Item = RawNameRecord>,
    {
        self.observe(
            Stage::UniqueNames,
            |s: &NameSummary| s.names,
            || {
                let table = ingest::unique_names(records, &*self.normalizer, &self.ingest)?;
                self.store
                    .replace_names(&table.names, &table.links)
                    .map_err(PipelineError::store(Stage::UniqueNames))?;
                Ok(NameSummary {
                    names: table.names.len(),
                    stats: table.stats,
                })
            },
        )
    }

    /// Stage 2: blocks the `name` table into candidate pairs, replacing
    /// `pair`.
    pub fn filter_pairs(&self) -> Result<BlockingStats, PipelineError> {
        self.observe(
            Stage::FilterPairs,
            |s: &BlockingStats| s.candidates,
            || {
                let names = self
                    .store
                    .load_names()
                    .map_err(PipelineError::store(Stage::FilterPairs))?;
                let out = perceptual::block_names(&names, &self.blocking)?;

                let texts: HashMap<NameId, &str> =
                    names.iter().map(|n| (n.id, n.text.as_str())).collect();
                let text = |id: NameId| {
                    texts
                        .get(&id)
                        .map(|t| (*t).to_owned())
                        .ok_or(PipelineError::DanglingName {
                            stage: Stage::FilterPairs,
                            table: Table::Name,
                            id,
                        })
                };
                let pairs = out
                    .pairs
                    .iter()
                    .map(|&pair| {
                        Ok(NamedPair {
                            pair,
                            name1: text(pair.a)?,
                            name2: text(pair.b)?,
                        })
                    })
                    .collect::<Result<Vec<_>, PipelineError>>()?;

                self.store
                    .replace_pairs(&pairs)
                    .map_err(PipelineError::store(Stage::FilterPairs))?;
                Ok(out.stats)
            },
        )
    }

    /// Stage 3: verifies the `pair` table and numbers the resulting
    /// components, replacing `match`.
    pub fn find_groups(&self) -> Result<GroupSummary, PipelineError> {
        self.observe(
            Stage::FindGroups,
            |s: &GroupSummary| s.grouped_names,
            || {
                let pairs = self
                    .store
                    .load_pairs()
                    .map_err(PipelineError::store(Stage::FindGroups))?;
                let out = matcher::find_groups(&pairs, &*self.normalizer, &self.matching)
                    .map_err(PipelineError::FindGroups)?;
                self.store
                    .replace_matches(&out.matches)
                    .map_err(PipelineError::store(Stage::FindGroups))?;
                Ok(GroupSummary {
                    candidates: out.verify.candidates,
                    verified: out.edges.len(),
                    components: out.components.len(),
                    grouped_names: out.matches.len(),
                    largest: out.components.first().map_or(0, Vec::len),
                })
            },
        )
    }

    /// Stage 4: assigns every name a firm and projects firms onto records,
    /// replacing `firm` and `record_firm`.
    pub fn merge_firms(&self) -> Result<FirmSummary, PipelineError> {
        self.observe(
            Stage::MergeFirms,
            |s: &FirmSummary| s.names,
            || {
                let names = self
                    .store
                    .load_names()
                    .map_err(PipelineError::store(Stage::MergeFirms))?;
                let matches = self
                    .store
                    .load_matches()
                    .map_err(PipelineError::store(Stage::MergeFirms))?;
                let links = self
                    .store
                    .load_record_names()
                    .map_err(PipelineError::store(Stage::MergeFirms))?;

                let base_offset = self.matching.base_offset;
                let firms = matcher::merge_firms(names.iter().map(|n| n.id), &matches, base_offset)
                    .map_err(PipelineError::MergeFirms)?;
                let records = project_records(&links, &firms)?;
                self.store
                    .replace_firms(&firms, &records)
                    .map_err(PipelineError::store(Stage::MergeFirms))?;

                let mut grouped: Vec<FirmId> = firms
                    .iter()
                    .map(|f| f.firm_num)
                    .filter(|&n| n < base_offset)
                    .collect();
                grouped.sort_unstable();
                grouped.dedup();
                Ok(FirmSummary {
                    names: firms.len(),
                    grouped_firms: grouped.len(),
                    singletons: firms.iter().filter(|f| f.firm_num >= base_offset).count(),
                    records: records.len(),
                })
            },
        )
    }

    /// Grouped firms joined with their member names, ordered by
    /// `(firm_num, id)`.
    pub fn groups(&self) -> Result<Vec<GroupMember>, PipelineError> {
        self.store
            .load_groups()
            .map_err(PipelineError::store(Stage::FindGroups))
    }

    fn observe<T>(
        &self,
        stage: Stage,
        rows: impl Fn(&T) -> usize,
        run: impl FnOnce() -> Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        let span = MetricsSpan::start(self.metrics.as_ref(), stage);
        let start = Instant::now();
        let result = run();
        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(value) => info!(
                stage = stage.as_str(),
                rows = rows(value),
                elapsed_micros,
                "stage_complete"
            ),
            Err(err) => warn!(
                stage = stage.as_str(),
                error = %err,
                elapsed_micros,
                "stage_failure"
            ),
        }
        if let Some(span) = span {
            span.finish(&result, |value| rows(value));
        }
        result
    }
}

/// Maps every record link to the firm of its name, sorted by
/// `(source, record_id)`.
pub fn project_records(
    links: &[RecordLink],
    firms: &[FirmAssignment],
) -> Result<Vec<RecordFirm>, PipelineError> {
    let by_name: HashMap<NameId, FirmId> = firms.iter().map(|f| (f.id, f.firm_num)).collect();
    let mut out = links
        .iter()
        .map(|link| {
            let firm_num = by_name
                .get(&link.name_id)
                .copied()
                .ok_or(PipelineError::DanglingName {
                    stage: Stage::MergeFirms,
                    table: Table::RecordName,
                    id: link.name_id,
                })?;
            Ok(RecordFirm {
                source: link.source.clone(),
                record_id: link.record_id.clone(),
                firm_num,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;
    out.sort();
    Ok(out)
}
