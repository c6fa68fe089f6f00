//! Persistent tables of the firmclust pipeline.
//!
//! Every stage reads the previous stage's table and replaces its own output
//! table(s) wholesale. [`TableStore`] is the single seam for that: the
//! pipeline never talks to a database directly.
//!
//! | Table | Columns | Written by |
//! |-------|---------|------------|
//! | `name` | `id, name` | unique names |
//! | `record_name` | `source, record_id, id` | unique names |
//! | `pair` | `id1, id2, name1, name2` | filter pairs |
//! | `match` | `firm_num, id` | find groups |
//! | `firm` | `firm_num, id` | merge firms |
//! | `record_firm` | `source, record_id, firm_num` | merge firms |
//!
//! Replacements are atomic per call: a failed write leaves the previous
//! contents in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod backend;

#[cfg(feature = "backend-sqlite")]
pub use crate::backend::sqlite::SqliteStore;
pub use crate::backend::{BackendConfig, InMemoryStore, TableStore};

use ingest::NameId;
use matcher::FirmId;

/// The tables a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Name,
    RecordName,
    Pair,
    Match,
    Firm,
    RecordFirm,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Name,
        Table::RecordName,
        Table::Pair,
        Table::Match,
        Table::Firm,
        Table::RecordFirm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Name => "name",
            Table::RecordName => "record_name",
            Table::Pair => "pair",
            Table::Match => "match",
            Table::Firm => "firm",
            Table::RecordFirm => "record_firm",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the `record_firm` table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordFirm {
    pub source: String,
    pub record_id: String,
    pub firm_num: FirmId,
}

/// A grouped firm member joined with its name text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupMember {
    pub firm_num: FirmId,
    pub id: NameId,
    pub name: String,
}

/// Custom error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("table {0} has not been written yet")]
    MissingTable(Table),
    #[error("table {table} holds an out-of-range value: {detail}")]
    Corrupt { table: Table, detail: String },
    #[error("value {value} in table {table} does not fit the store's integer type")]
    OutOfRange { table: Table, value: u64 },
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(feature = "backend-sqlite")]
impl From<rusqlite::Error> for IndexError {
    fn from(e: rusqlite::Error) -> Self {
        IndexError::backend(e)
    }
}
