use std::time::Instant;

use canonical::Normalizer;
use fxhash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::{IngestStats, NameEntry, NameId, NameTable, RawNameRecord, RecordLink};

/// Records between two progress events.
pub const PROGRESS_INTERVAL: usize = 100_000;

/// Incremental builder for a [`NameTable`].
///
/// Names are deduplicated on the exact bytes of their weak form and receive
/// ids in first-seen order, so the same record sequence always yields the same
/// table.
pub struct NameTableBuilder<'n, N: Normalizer + ?Sized> {
    normalizer: &'n N,
    cfg: IngestConfig,
    lookup: FxHashMap<String, NameId>,
    seen_records: FxHashSet<(String, String)>,
    table: NameTable,
}

impl<'n, N: Normalizer + ?Sized> NameTableBuilder<'n, N> {
    pub fn new(normalizer: &'n N, cfg: &IngestConfig) -> Result<Self, IngestError> {
        cfg.validate()?;
        Ok(Self {
            normalizer,
            cfg: cfg.clone(),
            lookup: FxHashMap::default(),
            seen_records: FxHashSet::default(),
            table: NameTable::default(),
        })
    }

    /// Adds one record, returning the name id it was linked to or `None` when
    /// the record was filtered.
    pub fn push(&mut self, record: RawNameRecord) -> Result<Option<NameId>, IngestError> {
        let position = self.table.stats.records;
        self.table.stats.records += 1;

        if is_blank_key(&record.source, self.cfg.strip_control_chars) {
            return Err(IngestError::MissingField {
                field: "source",
                position,
            });
        }
        if is_blank_key(&record.record_id, self.cfg.strip_control_chars) {
            return Err(IngestError::MissingField {
                field: "record_id",
                position,
            });
        }
        let RawNameRecord {
            source,
            record_id,
            name,
        } = record;

        if !self.seen_records.insert((source.clone(), record_id.clone())) {
            self.table.stats.duplicate_records += 1;
            if self.cfg.reject_duplicate_records {
                return Err(IngestError::DuplicateRecord {
                    record_source: source,
                    record_id,
                });
            }
            debug!(position, %source, %record_id, "duplicate_record_skipped");
            return Ok(None);
        }

        let Some(raw) = name else {
            self.table.stats.null_names += 1;
            debug!(position, %source, %record_id, reason = "null", "name_filtered");
            return Ok(None);
        };
        if raw.trim().is_empty() {
            self.table.stats.blank_names += 1;
            debug!(position, %source, %record_id, reason = "blank", "name_filtered");
            return Ok(None);
        }
        if self.cfg.max_name_bytes.is_some_and(|limit| raw.len() > limit) {
            self.table.stats.oversized_names += 1;
            debug!(position, %source, %record_id, len = raw.len(), reason = "oversized", "name_filtered");
            return Ok(None);
        }

        let weak = self.normalizer.weak(&raw);
        if weak.is_empty() {
            self.table.stats.empty_after_normalization += 1;
            debug!(position, %source, %record_id, reason = "empty_after_normalization", "name_filtered");
            return Ok(None);
        }

        let name_id = self.intern(weak)?;
        self.table.links.push(RecordLink {
            source,
            record_id,
            name_id,
        });
        self.table.stats.linked_records += 1;
        Ok(Some(name_id))
    }

    fn intern(&mut self, weak: String) -> Result<NameId, IngestError> {
        if let Some(&id) = self.lookup.get(&weak) {
            return Ok(id);
        }
        let id = NameId::try_from(self.table.names.len()).map_err(|_| IngestError::TooManyNames {
            limit: u64::from(NameId::MAX) + 1,
        })?;
        self.lookup.insert(weak.clone(), id);
        self.table.names.push(NameEntry { id, text: weak });
        Ok(id)
    }

    pub fn stats(&self) -> &IngestStats {
        &self.table.stats
    }

    pub fn finish(self) -> NameTable {
        self.table
    }
}

/// True when `value` holds nothing but whitespace (and, with
/// `strip_control`, control characters). Keys are stored as given.
fn is_blank_key(value: &str, strip_control: bool) -> bool {
    value
        .chars()
        .all(|c| c.is_whitespace() || (strip_control && c.is_control()))
}

/// Builds the unique-name table from a record sequence.
///
/// Every kept record maps to exactly one name; no two names share text. Null,
/// blank, oversized and normalize-to-empty names are filtered and counted.
///
/// # Errors
///
/// Fails on an invalid config, a record without source or record id, or (when
/// configured) a duplicate record key. Nothing is returned on failure, so a
/// caller persisting the table never sees a partial result.
pub fn unique_names<N, I>(
    records: I,
    normalizer: &N,
    cfg: &IngestConfig,
) -> Result<NameTable, IngestError>
where
    N: Normalizer + ?Sized,
    I: IntoIterator<Item = RawNameRecord>,
{
    let start = Instant::now();
    let mut builder = NameTableBuilder::new(normalizer, cfg)?;

    for record in records {
        if let Err(err) = builder.push(record) {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(error = %err, elapsed_micros, "unique_names_failure");
            return Err(err);
        }
        let seen = builder.stats().records;
        if seen % PROGRESS_INTERVAL == 0 {
            debug!(records = seen, names = builder.table.names.len(), "unique_names_progress");
        }
    }

    let table = builder.finish();
    let elapsed_micros = start.elapsed().as_micros();
    info!(
        records = table.stats.records,
        names = table.names.len(),
        links = table.links.len(),
        filtered = table.stats.filtered(),
        duplicate_records = table.stats.duplicate_records,
        elapsed_micros,
        "unique_names"
    );
    Ok(table)
}
