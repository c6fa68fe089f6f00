//! Record and name-table types.
use serde::{Deserialize, Serialize};

/// Dense identifier of a unique weak-normalized name, assigned in first-seen
/// order starting at 0.
pub type NameId = u32;

/// One raw record as extracted from an upstream document set.
///
/// `source` distinguishes record sets (for example `"apply"` and `"grant"`);
/// `record_id` is unique within its source. `name` is whatever the extractor
/// produced and may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNameRecord {
    pub source: String,
    pub record_id: String,
    pub name: Option<String>,
}

impl RawNameRecord {
    pub fn new(
        source: impl Into<String>,
        record_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            record_id: record_id.into(),
            name: Some(name.into()),
        }
    }

    /// A record whose extractor produced no name at all.
    pub fn without_name(source: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            record_id: record_id.into(),
            name: None,
        }
    }
}

/// A row of the `name` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub id: NameId,
    pub text: String,
}

/// A row of the `record_name` table: which name a kept record resolved to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordLink {
    pub source: String,
    pub record_id: String,
    pub name_id: NameId,
}

/// Counters collected while building a [`NameTable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Records seen.
    pub records: usize,
    /// Records whose name was `None`.
    pub null_names: usize,
    /// Records whose name was empty or whitespace-only before normalization.
    pub blank_names: usize,
    /// Records whose name normalized to the empty string.
    pub empty_after_normalization: usize,
    /// Records whose raw name exceeded `max_name_bytes`.
    pub oversized_names: usize,
    /// Later occurrences of an already seen `(source, record_id)`.
    pub duplicate_records: usize,
    /// Records that received a name id.
    pub linked_records: usize,
}

impl IngestStats {
    /// Records dropped for any name-related reason.
    pub fn filtered(&self) -> usize {
        self.null_names + self.blank_names + self.empty_after_normalization + self.oversized_names
    }
}

/// Output of the unique-names stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTable {
    /// Unique names, ordered by id. `names[i].id == i`.
    pub names: Vec<NameEntry>,
    /// One link per kept record, in input order.
    pub links: Vec<RecordLink>,
    pub stats: IngestStats,
}

impl NameTable {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Text of the name with the given id.
    pub fn text(&self, id: NameId) -> Option<&str> {
        self.names.get(id as usize).map(|n| n.text.as_str())
    }
}
