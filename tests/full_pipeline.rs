//! End-to-end runs against a SQLite store on disk.

use std::path::Path;

use firmclust::{
    FirmAssignment, NameEntry, Pipeline, RawNameRecord, RecordFirm, SqliteStore, Table, TableStore,
};
use tempfile::TempDir;

fn sqlite_pipeline(path: &Path) -> Pipeline {
    let store = SqliteStore::open(path).expect("open sqlite store");
    Pipeline::new(Box::new(store))
}

fn acme_records() -> Vec<RawNameRecord> {
    vec![
        RawNameRecord::new("filings", "f1", "Acme Corp"),
        RawNameRecord::new("filings", "f2", "ACME CORPORATION"),
        RawNameRecord::new("filings", "f3", "Acme Corp."),
        RawNameRecord::new("filings", "f4", "Zenith LLC"),
        RawNameRecord::new("filings", "f5", ""),
        RawNameRecord::without_name("filings", "f6"),
    ]
}

fn names(entries: &[(u32, &str)]) -> Vec<NameEntry> {
    entries
        .iter()
        .map(|&(id, text)| NameEntry {
            id,
            text: text.to_string(),
        })
        .collect()
}

#[test]
fn acme_scenario_produces_expected_tables() {
    let dir = TempDir::new().unwrap();
    let pipeline = sqlite_pipeline(&dir.path().join("firms.db"));
    pipeline.run(acme_records()).expect("pipeline run");
    let store = pipeline.store();

    assert_eq!(
        store.load_names().unwrap(),
        names(&[(0, "ACME CORP"), (1, "ACME CORPORATION"), (2, "ZENITH LLC")])
    );
    let pairs = store.load_pairs().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(
        (pairs[0].name1.as_str(), pairs[0].name2.as_str()),
        ("ACME CORP", "ACME CORPORATION")
    );
    assert_eq!(
        store.load_matches().unwrap(),
        vec![
            FirmAssignment { firm_num: 0, id: 0 },
            FirmAssignment { firm_num: 0, id: 1 },
        ]
    );
    assert_eq!(
        store.load_firms().unwrap(),
        vec![
            FirmAssignment { firm_num: 0, id: 0 },
            FirmAssignment { firm_num: 0, id: 1 },
            FirmAssignment {
                firm_num: 1_000_002,
                id: 2
            },
        ]
    );

    let record_firms = store.load_record_firms().unwrap();
    let expected: Vec<RecordFirm> = [("f1", 0), ("f2", 0), ("f3", 0), ("f4", 1_000_002)]
        .iter()
        .map(|&(id, firm_num)| RecordFirm {
            source: "filings".into(),
            record_id: id.into(),
            firm_num,
        })
        .collect();
    assert_eq!(record_firms, expected);
}

#[test]
fn empty_names_never_reach_the_name_table() {
    let dir = TempDir::new().unwrap();
    let pipeline = sqlite_pipeline(&dir.path().join("firms.db"));
    let report = pipeline
        .unique_names(vec![
            RawNameRecord::new("s", "1", ""),
            RawNameRecord::new("s", "2", " .. "),
            RawNameRecord::without_name("s", "3"),
        ])
        .unwrap();
    assert_eq!(report.names, 0);
    assert_eq!(report.stats.filtered(), 3);
    assert!(pipeline.store().load_names().unwrap().is_empty());
}

#[test]
fn candidate_pair_below_threshold_is_not_matched() {
    let dir = TempDir::new().unwrap();
    let pipeline = sqlite_pipeline(&dir.path().join("firms.db"));
    // Strong forms are 4 edits apart over 8 chars: similarity 0.5.
    let report = pipeline
        .run(vec![
            RawNameRecord::new("s", "1", "Acme"),
            RawNameRecord::new("s", "2", "Acme NYC"),
        ])
        .unwrap();

    assert_eq!(report.pairs.candidates, 1);
    assert_eq!(report.groups.verified, 0);
    let pairs = pipeline.store().load_pairs().unwrap();
    assert_eq!((pairs[0].name1.as_str(), pairs[0].name2.as_str()), ("ACME", "ACME NYC"));
    assert!(pipeline.store().load_matches().unwrap().is_empty());
    assert_eq!(
        pipeline.store().load_firms().unwrap(),
        vec![
            FirmAssignment {
                firm_num: 1_000_000,
                id: 0
            },
            FirmAssignment {
                firm_num: 1_000_001,
                id: 1
            },
        ]
    );
}

#[test]
fn stages_resume_from_a_reopened_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("firms.db");

    sqlite_pipeline(&path).unique_names(acme_records()).unwrap();
    sqlite_pipeline(&path).filter_pairs().unwrap();
    sqlite_pipeline(&path).find_groups().unwrap();
    sqlite_pipeline(&path).merge_firms().unwrap();

    let reopened = sqlite_pipeline(&path);
    for table in Table::ALL {
        assert!(reopened.store().has_table(table).unwrap(), "{table} missing");
    }
    let groups = reopened.groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "ACME CORP");
    assert_eq!(groups[1].name, "ACME CORPORATION");
}

#[test]
fn rerun_fully_replaces_tables() {
    let dir = TempDir::new().unwrap();
    let pipeline = sqlite_pipeline(&dir.path().join("firms.db"));
    pipeline.run(acme_records()).unwrap();
    pipeline
        .run(vec![RawNameRecord::new("other", "1", "Globex Inc")])
        .unwrap();

    let store = pipeline.store();
    assert_eq!(store.load_names().unwrap(), names(&[(0, "GLOBEX INC")]));
    assert!(store.load_pairs().unwrap().is_empty());
    assert!(store.load_matches().unwrap().is_empty());
    assert_eq!(store.load_record_firms().unwrap().len(), 1);
}

#[test]
fn every_name_has_exactly_one_firm_in_disjoint_ranges() {
    let dir = TempDir::new().unwrap();
    let pipeline = sqlite_pipeline(&dir.path().join("firms.db"));
    let records: Vec<RawNameRecord> = [
        "Northwind Traders",
        "NORTHWIND TRADERS LTD",
        "Northwind Trader",
        "Globex",
        "Globex Corporation",
        "Initech",
        "Hooli",
        "Hooli Inc",
        "Umbrella",
    ]
    .iter()
    .enumerate()
    .map(|(i, n)| RawNameRecord::new("s", i.to_string(), *n))
    .collect();
    pipeline.run(records).unwrap();

    let store = pipeline.store();
    let names = store.load_names().unwrap();
    let firms = store.load_firms().unwrap();
    assert_eq!(firms.len(), names.len());
    for (name, firm) in names.iter().zip(&firms) {
        assert_eq!(name.id, firm.id);
        if firm.firm_num >= 1_000_000 {
            assert_eq!(firm.firm_num - 1_000_000, u64::from(firm.id));
        }
    }
    let grouped = store.load_matches().unwrap();
    // Northwind variants form firm 0, the Hooli pair firm 1.
    let expected: Vec<FirmAssignment> = [(0, 0), (0, 1), (0, 2), (1, 6), (1, 7)]
        .iter()
        .map(|&(firm_num, id)| FirmAssignment { firm_num, id })
        .collect();
    assert_eq!(grouped, expected);
    for row in &grouped {
        assert!(firms.contains(row));
    }
}

#[test]
fn long_names_still_get_a_firm() {
    let dir = TempDir::new().unwrap();
    let pipeline = sqlite_pipeline(&dir.path().join("firms.db"));
    let long = format!("ACME {}", "X".repeat(5000));
    let report = pipeline
        .run(vec![RawNameRecord::new("s", "1", long.as_str())])
        .unwrap();

    assert_eq!(report.names.names, 1);
    assert_eq!(report.names.stats.oversized_names, 0);
    assert_eq!(report.firms.records, 1);
    assert_eq!(
        pipeline.store().load_record_firms().unwrap(),
        vec![RecordFirm {
            source: "s".into(),
            record_id: "1".into(),
            firm_num: 1_000_000,
        }]
    );
}

#[test]
fn record_projections_keep_original_keys() {
    let dir = TempDir::new().unwrap();
    let pipeline = sqlite_pipeline(&dir.path().join("firms.db"));
    pipeline
        .run(vec![
            RawNameRecord::new("filings", " f-001 ", "Acme Corp"),
            RawNameRecord::new("filings", "f-002\t", "ACME CORPORATION"),
        ])
        .unwrap();

    let record_ids: Vec<String> = pipeline
        .store()
        .load_record_firms()
        .unwrap()
        .into_iter()
        .map(|row| {
            assert_eq!(row.firm_num, 0);
            row.record_id
        })
        .collect();
    assert_eq!(record_ids, [" f-001 ", "f-002\t"]);
}
