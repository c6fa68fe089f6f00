use std::collections::HashMap;
use std::sync::RwLock;

use ingest::{NameEntry, NameId, RecordLink};
use matcher::{FirmAssignment, NamedPair};
use serde::{Deserialize, Serialize};

use crate::{GroupMember, IndexError, RecordFirm, Table};

#[cfg(feature = "backend-sqlite")]
pub mod sqlite;

/// Storage for the pipeline tables.
///
/// Each `replace_*` call swaps in the new contents atomically. Each `load_*`
/// call fails with [`IndexError::MissingTable`] when the table was never
/// written, and otherwise returns rows in a fixed order:
///
/// - names and firms by name id
/// - record projections by `(source, record_id)`
/// - pairs by `(id1, id2)`
/// - match rows and groups by `(firm_num, id)`
pub trait TableStore: Send + Sync {
    /// Replaces `name` and `record_name` together.
    fn replace_names(&self, names: &[NameEntry], links: &[RecordLink]) -> Result<(), IndexError>;
    fn load_names(&self) -> Result<Vec<NameEntry>, IndexError>;
    fn load_record_names(&self) -> Result<Vec<RecordLink>, IndexError>;

    fn replace_pairs(&self, pairs: &[NamedPair]) -> Result<(), IndexError>;
    fn load_pairs(&self) -> Result<Vec<NamedPair>, IndexError>;

    fn replace_matches(&self, rows: &[FirmAssignment]) -> Result<(), IndexError>;
    fn load_matches(&self) -> Result<Vec<FirmAssignment>, IndexError>;

    /// Replaces `firm` and `record_firm` together.
    fn replace_firms(
        &self,
        firms: &[FirmAssignment],
        records: &[RecordFirm],
    ) -> Result<(), IndexError>;
    fn load_firms(&self) -> Result<Vec<FirmAssignment>, IndexError>;
    fn load_record_firms(&self) -> Result<Vec<RecordFirm>, IndexError>;

    fn has_table(&self, table: Table) -> Result<bool, IndexError>;

    /// Grouped firms joined with their member names.
    fn load_groups(&self) -> Result<Vec<GroupMember>, IndexError> {
        let names = self.load_names()?;
        let texts: HashMap<NameId, &str> =
            names.iter().map(|n| (n.id, n.text.as_str())).collect();
        self.load_matches()?
            .into_iter()
            .map(|m| {
                let name = texts.get(&m.id).ok_or_else(|| IndexError::Corrupt {
                    table: Table::Match,
                    detail: format!("name id {} is not in the name table", m.id),
                })?;
                Ok(GroupMember {
                    firm_num: m.firm_num,
                    id: m.id,
                    name: (*name).to_string(),
                })
            })
            .collect()
    }

    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Selects and builds a table store.
///
/// ```
/// use index::BackendConfig;
///
/// let config = BackendConfig::in_memory();
/// let store = config.build().unwrap();
/// assert!(!store.has_table(index::Table::Name).unwrap());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendConfig {
    /// SQLite database file; created on first use.
    Sqlite { path: String },
    /// Tables live in process memory and vanish with it.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn sqlite<P: Into<String>>(path: P) -> Self {
        BackendConfig::Sqlite { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn TableStore>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryStore::new())),
            BackendConfig::Sqlite { path } => {
                #[cfg(feature = "backend-sqlite")]
                {
                    Ok(Box::new(sqlite::SqliteStore::open(path)?))
                }
                #[cfg(not(feature = "backend-sqlite"))]
                {
                    let _ = path;
                    Err(IndexError::backend("sqlite backend disabled at compile time"))
                }
            }
        }
    }
}

#[derive(Default)]
struct Tables {
    names: Option<Vec<NameEntry>>,
    record_names: Option<Vec<RecordLink>>,
    pairs: Option<Vec<NamedPair>>,
    matches: Option<Vec<FirmAssignment>>,
    firms: Option<Vec<FirmAssignment>>,
    record_firms: Option<Vec<RecordFirm>>,
}

/// Tables held behind a `RwLock`. Useful for tests and one-shot runs.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T: Clone>(
        &self,
        table: Table,
        pick: impl FnOnce(&Tables) -> &Option<Vec<T>>,
    ) -> Result<Vec<T>, IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        pick(&*guard).clone().ok_or(IndexError::MissingTable(table))
    }

    fn write(&self, apply: impl FnOnce(&mut Tables)) -> Result<(), IndexError> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        apply(&mut *guard);
        Ok(())
    }
}

fn sorted<T: Clone>(rows: &[T], mut cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Vec<T> {
    let mut out = rows.to_vec();
    out.sort_by(|a, b| cmp(a, b));
    out
}

fn by_record_link(a: &RecordLink, b: &RecordLink) -> std::cmp::Ordering {
    (&a.source, &a.record_id).cmp(&(&b.source, &b.record_id))
}

fn by_record_firm(a: &RecordFirm, b: &RecordFirm) -> std::cmp::Ordering {
    (&a.source, &a.record_id).cmp(&(&b.source, &b.record_id))
}

impl TableStore for InMemoryStore {
    fn replace_names(&self, names: &[NameEntry], links: &[RecordLink]) -> Result<(), IndexError> {
        let names = sorted(names, |a, b| a.id.cmp(&b.id));
        let links = sorted(links, by_record_link);
        self.write(|t| {
            t.names = Some(names);
            t.record_names = Some(links);
        })
    }

    fn load_names(&self) -> Result<Vec<NameEntry>, IndexError> {
        self.read(Table::Name, |t| &t.names)
    }

    fn load_record_names(&self) -> Result<Vec<RecordLink>, IndexError> {
        self.read(Table::RecordName, |t| &t.record_names)
    }

    fn replace_pairs(&self, pairs: &[NamedPair]) -> Result<(), IndexError> {
        let pairs = sorted(pairs, |a, b| a.pair.cmp(&b.pair));
        self.write(|t| t.pairs = Some(pairs))
    }

    fn load_pairs(&self) -> Result<Vec<NamedPair>, IndexError> {
        self.read(Table::Pair, |t| &t.pairs)
    }

    fn replace_matches(&self, rows: &[FirmAssignment]) -> Result<(), IndexError> {
        let rows = sorted(rows, |a, b| a.cmp(b));
        self.write(|t| t.matches = Some(rows))
    }

    fn load_matches(&self) -> Result<Vec<FirmAssignment>, IndexError> {
        self.read(Table::Match, |t| &t.matches)
    }

    fn replace_firms(
        &self,
        firms: &[FirmAssignment],
        records: &[RecordFirm],
    ) -> Result<(), IndexError> {
        let firms = sorted(firms, |a, b| a.id.cmp(&b.id));
        let records = sorted(records, by_record_firm);
        self.write(|t| {
            t.firms = Some(firms);
            t.record_firms = Some(records);
        })
    }

    fn load_firms(&self) -> Result<Vec<FirmAssignment>, IndexError> {
        self.read(Table::Firm, |t| &t.firms)
    }

    fn load_record_firms(&self) -> Result<Vec<RecordFirm>, IndexError> {
        self.read(Table::RecordFirm, |t| &t.record_firms)
    }

    fn has_table(&self, table: Table) -> Result<bool, IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(match table {
            Table::Name => guard.names.is_some(),
            Table::RecordName => guard.record_names.is_some(),
            Table::Pair => guard.pairs.is_some(),
            Table::Match => guard.matches.is_some(),
            Table::Firm => guard.firms.is_some(),
            Table::RecordFirm => guard.record_firms.is_some(),
        })
    }
}
