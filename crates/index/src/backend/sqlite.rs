//! SQLite backend.
//!
//! One database file holds all six tables. Every replacement runs in a single
//! transaction (`DROP`, `CREATE`, bulk `INSERT`, `COMMIT`), so readers see
//! either the old table or the new one. Integer columns are SQLite's signed
//! 64-bit type; ids are range-checked in both directions.

use std::path::Path;
use std::sync::Mutex;

use ingest::{NameEntry, NameId, RecordLink};
use log::debug;
use matcher::{FirmAssignment, FirmId, NamedPair};
use perceptual::CandidatePair;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::{GroupMember, IndexError, RecordFirm, Table, TableStore};

fn schema(table: Table) -> &'static str {
    match table {
        Table::Name => "id INTEGER PRIMARY KEY, name TEXT NOT NULL",
        Table::RecordName => "source TEXT NOT NULL, record_id TEXT NOT NULL, id INTEGER NOT NULL",
        Table::Pair => {
            "id1 INTEGER NOT NULL, id2 INTEGER NOT NULL, name1 TEXT NOT NULL, name2 TEXT NOT NULL"
        }
        Table::Match | Table::Firm => "firm_num INTEGER NOT NULL, id INTEGER NOT NULL",
        Table::RecordFirm => {
            "source TEXT NOT NULL, record_id TEXT NOT NULL, firm_num INTEGER NOT NULL"
        }
    }
}

fn recreate(tx: &Transaction<'_>, table: Table) -> Result<(), IndexError> {
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS \"{name}\"; CREATE TABLE \"{name}\" ({schema});",
        name = table.name(),
        schema = schema(table)
    ))?;
    Ok(())
}

fn firm_to_sql(table: Table, firm_num: FirmId) -> Result<i64, IndexError> {
    i64::try_from(firm_num).map_err(|_| IndexError::OutOfRange {
        table,
        value: firm_num,
    })
}

fn name_id_from_sql(table: Table, value: i64) -> Result<NameId, IndexError> {
    NameId::try_from(value).map_err(|_| IndexError::Corrupt {
        table,
        detail: format!("name id {value}"),
    })
}

fn firm_from_sql(table: Table, value: i64) -> Result<FirmId, IndexError> {
    FirmId::try_from(value).map_err(|_| IndexError::Corrupt {
        table,
        detail: format!("firm id {value}"),
    })
}

fn table_exists(conn: &Connection, table: Table) -> Result<bool, IndexError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table.name()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn ensure_table(conn: &Connection, table: Table) -> Result<(), IndexError> {
    if table_exists(conn, table)? {
        Ok(())
    } else {
        Err(IndexError::MissingTable(table))
    }
}

fn write_firm_rows(
    tx: &Transaction<'_>,
    table: Table,
    rows: &[FirmAssignment],
) -> Result<(), IndexError> {
    recreate(tx, table)?;
    let mut stmt = tx.prepare_cached(&format!(
        "INSERT INTO \"{}\" (firm_num, id) VALUES (?1, ?2)",
        table.name()
    ))?;
    for row in rows {
        stmt.execute(params![firm_to_sql(table, row.firm_num)?, i64::from(row.id)])?;
    }
    Ok(())
}

fn read_firm_rows(
    conn: &Connection,
    table: Table,
    order: &str,
) -> Result<Vec<FirmAssignment>, IndexError> {
    ensure_table(conn, table)?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT firm_num, id FROM \"{}\" ORDER BY {order}",
        table.name()
    ))?;
    let raw = stmt
        .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter()
        .map(|(firm_num, id)| {
            Ok(FirmAssignment {
                firm_num: firm_from_sql(table, firm_num)?,
                id: name_id_from_sql(table, id)?,
            })
        })
        .collect()
}

/// [`TableStore`] over a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A private database that disappears when the store is dropped.
    pub fn open_in_memory() -> Result<Self, IndexError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn with_conn<R>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<R, IndexError>,
    ) -> Result<R, IndexError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        f(&mut *guard)
    }
}

impl TableStore for SqliteStore {
    fn replace_names(&self, names: &[NameEntry], links: &[RecordLink]) -> Result<(), IndexError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            recreate(&tx, Table::Name)?;
            {
                let mut stmt = tx.prepare_cached("INSERT INTO name (id, name) VALUES (?1, ?2)")?;
                for n in names {
                    stmt.execute(params![i64::from(n.id), n.text])?;
                }
            }
            recreate(&tx, Table::RecordName)?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO record_name (source, record_id, id) VALUES (?1, ?2, ?3)",
                )?;
                for l in links {
                    stmt.execute(params![l.source, l.record_id, i64::from(l.name_id)])?;
                }
            }
            tx.commit()?;
            debug!("replaced name ({} rows) and record_name ({} rows)", names.len(), links.len());
            Ok(())
        })
    }

    fn load_names(&self) -> Result<Vec<NameEntry>, IndexError> {
        self.with_conn(|conn| {
            ensure_table(conn, Table::Name)?;
            let mut stmt = conn.prepare_cached("SELECT id, name FROM name ORDER BY id")?;
            let raw = stmt
                .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            raw.into_iter()
                .map(|(id, text)| {
                    Ok(NameEntry {
                        id: name_id_from_sql(Table::Name, id)?,
                        text,
                    })
                })
                .collect()
        })
    }

    fn load_record_names(&self) -> Result<Vec<RecordLink>, IndexError> {
        self.with_conn(|conn| {
            ensure_table(conn, Table::RecordName)?;
            let mut stmt = conn.prepare_cached(
                "SELECT source, record_id, id FROM record_name ORDER BY source, record_id",
            )?;
            let raw = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            raw.into_iter()
                .map(|(source, record_id, id)| {
                    Ok(RecordLink {
                        source,
                        record_id,
                        name_id: name_id_from_sql(Table::RecordName, id)?,
                    })
                })
                .collect()
        })
    }

    fn replace_pairs(&self, pairs: &[NamedPair]) -> Result<(), IndexError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            recreate(&tx, Table::Pair)?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO pair (id1, id2, name1, name2) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for p in pairs {
                    stmt.execute(params![
                        i64::from(p.pair.a),
                        i64::from(p.pair.b),
                        p.name1,
                        p.name2
                    ])?;
                }
            }
            tx.commit()?;
            debug!("replaced pair ({} rows)", pairs.len());
            Ok(())
        })
    }

    fn load_pairs(&self) -> Result<Vec<NamedPair>, IndexError> {
        self.with_conn(|conn| {
            ensure_table(conn, Table::Pair)?;
            let mut stmt = conn
                .prepare_cached("SELECT id1, id2, name1, name2 FROM pair ORDER BY id1, id2")?;
            let raw = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            raw.into_iter()
                .map(|(id1, id2, name1, name2)| {
                    let a = name_id_from_sql(Table::Pair, id1)?;
                    let b = name_id_from_sql(Table::Pair, id2)?;
                    let pair = CandidatePair::new(a, b)
                        .filter(|p| p.a == a)
                        .ok_or_else(|| IndexError::Corrupt {
                            table: Table::Pair,
                            detail: format!("pair ({id1}, {id2}) is not ordered"),
                        })?;
                    Ok(NamedPair { pair, name1, name2 })
                })
                .collect()
        })
    }

    fn replace_matches(&self, rows: &[FirmAssignment]) -> Result<(), IndexError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            write_firm_rows(&tx, Table::Match, rows)?;
            tx.commit()?;
            debug!("replaced match ({} rows)", rows.len());
            Ok(())
        })
    }

    fn load_matches(&self) -> Result<Vec<FirmAssignment>, IndexError> {
        self.with_conn(|conn| read_firm_rows(conn, Table::Match, "firm_num, id"))
    }

    fn replace_firms(
        &self,
        firms: &[FirmAssignment],
        records: &[RecordFirm],
    ) -> Result<(), IndexError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            write_firm_rows(&tx, Table::Firm, firms)?;
            recreate(&tx, Table::RecordFirm)?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO record_firm (source, record_id, firm_num) VALUES (?1, ?2, ?3)",
                )?;
                for r in records {
                    stmt.execute(params![
                        r.source,
                        r.record_id,
                        firm_to_sql(Table::RecordFirm, r.firm_num)?
                    ])?;
                }
            }
            tx.commit()?;
            debug!("replaced firm ({} rows) and record_firm ({} rows)", firms.len(), records.len());
            Ok(())
        })
    }

    fn load_firms(&self) -> Result<Vec<FirmAssignment>, IndexError> {
        self.with_conn(|conn| read_firm_rows(conn, Table::Firm, "id"))
    }

    fn load_record_firms(&self) -> Result<Vec<RecordFirm>, IndexError> {
        self.with_conn(|conn| {
            ensure_table(conn, Table::RecordFirm)?;
            let mut stmt = conn.prepare_cached(
                "SELECT source, record_id, firm_num FROM record_firm ORDER BY source, record_id",
            )?;
            let raw = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            raw.into_iter()
                .map(|(source, record_id, firm_num)| {
                    Ok(RecordFirm {
                        source,
                        record_id,
                        firm_num: firm_from_sql(Table::RecordFirm, firm_num)?,
                    })
                })
                .collect()
        })
    }

    fn has_table(&self, table: Table) -> Result<bool, IndexError> {
        self.with_conn(|conn| table_exists(conn, table))
    }

    fn load_groups(&self) -> Result<Vec<GroupMember>, IndexError> {
        self.with_conn(|conn| {
            ensure_table(conn, Table::Match)?;
            ensure_table(conn, Table::Name)?;
            let mut stmt = conn.prepare_cached(
                "SELECT m.firm_num, m.id, n.name FROM \"match\" m \
                 LEFT JOIN name n ON n.id = m.id \
                 ORDER BY m.firm_num, m.id",
            )?;
            let raw = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, Option<String>>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            raw.into_iter()
                .map(|(firm_num, id, name)| {
                    let name = name.ok_or_else(|| IndexError::Corrupt {
                        table: Table::Match,
                        detail: format!("name id {id} is not in the name table"),
                    })?;
                    Ok(GroupMember {
                        firm_num: firm_from_sql(Table::Match, firm_num)?,
                        id: name_id_from_sql(Table::Match, id)?,
                        name,
                    })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::{check_store_contract, sample_links, sample_names};
    use tempfile::tempdir;

    #[test]
    fn in_memory_sqlite_contract() {
        check_store_contract(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn file_sqlite_contract_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("firms.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            check_store_contract(&store);
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load_names().unwrap().len(), 3);
        assert_eq!(reopened.load_firms().unwrap().len(), 3);
    }

    #[test]
    fn failed_replacement_keeps_previous_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        let good = vec![FirmAssignment { firm_num: 0, id: 0 }];
        store.replace_firms(&good, &[]).unwrap();

        let bad = vec![
            FirmAssignment { firm_num: 1, id: 1 },
            FirmAssignment {
                firm_num: u64::MAX,
                id: 2,
            },
        ];
        let err = store.replace_firms(&bad, &[]).unwrap_err();
        assert_eq!(
            err,
            IndexError::OutOfRange {
                table: Table::Firm,
                value: u64::MAX
            }
        );
        assert_eq!(store.load_firms().unwrap(), good);
    }

    #[test]
    fn groups_use_sql_join() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.replace_names(&sample_names(), &sample_links()).unwrap();
        store
            .replace_matches(&[
                FirmAssignment { firm_num: 0, id: 2 },
                FirmAssignment { firm_num: 0, id: 9 },
            ])
            .unwrap();
        let err = store.load_groups().unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }));
    }

    #[test]
    fn build_from_config_opens_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.db");
        let store = crate::BackendConfig::sqlite(path.to_string_lossy())
            .build()
            .unwrap();
        store.replace_pairs(&[]).unwrap();
        assert!(path.exists());
    }
}
