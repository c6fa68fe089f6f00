use firmclust::{
    FirmAssignment, MatchConfig, NameEntry, NamedPair, Pipeline, RawNameRecord, RecordFirm,
    SqliteStore, TableStore,
};
use tempfile::TempDir;

const NAMES: &[&str] = &[
    "Acme Corp",
    "ACME CORPORATION",
    "Acme Corp.",
    "Acme Corpp",
    "Zenith LLC",
    "Zenith, L.L.C.",
    "Zenith Holdings",
    "Northwind Traders Ltd",
    "Northwind Trader",
    "Globex",
    "Globex Corporation",
    "Initech Inc",
    "Initech",
    "Soylent Green Co",
    "Soylent Green Company",
    "Hooli",
    "Vandelay Industries",
    "Vandelay Industry",
    "Wonka Industries GmbH",
    "Tyrell",
];

fn records() -> Vec<RawNameRecord> {
    NAMES
        .iter()
        .enumerate()
        .map(|(i, n)| RawNameRecord::new("det", format!("r{i:03}"), *n))
        .collect()
}

type Tables = (
    Vec<NameEntry>,
    Vec<NamedPair>,
    Vec<FirmAssignment>,
    Vec<FirmAssignment>,
    Vec<RecordFirm>,
);

fn snapshot(store: &dyn TableStore) -> Tables {
    (
        store.load_names().unwrap(),
        store.load_pairs().unwrap(),
        store.load_matches().unwrap(),
        store.load_firms().unwrap(),
        store.load_record_firms().unwrap(),
    )
}

#[test]
fn default_config_groups_the_obvious_variants() {
    let pipeline = Pipeline::in_memory();
    let report = pipeline.run(records()).unwrap();
    assert!(report.pairs.candidates >= 6, "{:?}", report.pairs);
    assert_eq!(report.groups.components, 4);

    let groups = pipeline.groups().unwrap();
    let mut members: Vec<(u64, &str)> = groups
        .iter()
        .map(|g| (g.firm_num, g.name.as_str()))
        .collect();
    members.sort();
    assert_eq!(
        members,
        [
            (0, "ACME CORP"),
            (0, "ACME CORPORATION"),
            (1, "NORTHWIND TRADER"),
            (1, "NORTHWIND TRADERS LTD"),
            (2, "INITECH"),
            (2, "INITECH INC"),
            (3, "SOYLENT GREEN CO"),
            (3, "SOYLENT GREEN COMPANY"),
        ]
    );
}

#[test]
fn two_runs_produce_identical_tables() {
    let first = Pipeline::in_memory();
    first.run(records()).unwrap();
    let second = Pipeline::in_memory();
    second.run(records()).unwrap();
    let tables = snapshot(first.store());
    assert!(tables.2.len() >= 8, "too few grouped names: {:?}", tables.2);
    assert_eq!(tables, snapshot(second.store()));
}

#[test]
fn rerun_on_the_same_database_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("det.db");
    let pipeline = Pipeline::new(Box::new(SqliteStore::open(&path).unwrap()));

    pipeline.run(records()).unwrap();
    let before = snapshot(pipeline.store());
    pipeline.run(records()).unwrap();
    assert_eq!(snapshot(pipeline.store()), before);
}

#[test]
fn sqlite_and_memory_stores_agree() {
    let dir = TempDir::new().unwrap();
    let on_disk = Pipeline::new(Box::new(SqliteStore::open(dir.path().join("a.db")).unwrap()));
    let in_memory = Pipeline::in_memory();
    on_disk.run(records()).unwrap();
    in_memory.run(records()).unwrap();
    assert_eq!(snapshot(on_disk.store()), snapshot(in_memory.store()));
}

#[test]
fn input_order_does_not_change_the_partition() {
    let forward = Pipeline::in_memory();
    forward.run(records()).unwrap();
    let backward = Pipeline::in_memory();
    backward.run(records().into_iter().rev()).unwrap();

    // Name ids follow input order, so compare partitions by text.
    let partition = |p: &Pipeline| {
        let store = p.store();
        let names = store.load_names().unwrap();
        let firms = store.load_firms().unwrap();
        let mut groups: std::collections::BTreeMap<u64, Vec<String>> = Default::default();
        for (name, firm) in names.iter().zip(&firms) {
            let key = if firm.firm_num < 1_000_000 {
                firm.firm_num
            } else {
                u64::MAX - u64::from(firm.id)
            };
            groups.entry(key).or_default().push(name.text.clone());
        }
        let mut sets: Vec<Vec<String>> = groups
            .into_values()
            .map(|mut g| {
                g.sort();
                g
            })
            .collect();
        sets.sort();
        sets
    };
    let groups = partition(&forward);
    assert_eq!(groups.iter().filter(|g| g.len() > 1).count(), 4);
    assert_eq!(groups, partition(&backward));
}

#[test]
fn pairs_have_no_duplicates_or_self_pairs() {
    let pipeline = Pipeline::in_memory();
    pipeline.run(records()).unwrap();
    let pairs = pipeline.store().load_pairs().unwrap();
    assert!(pairs.len() >= 6);
    for w in pairs.windows(2) {
        assert!(w[0].pair < w[1].pair);
    }
    assert!(pairs.iter().all(|p| p.pair.a < p.pair.b));
}

#[test]
fn raising_the_threshold_never_adds_edges() {
    let mut counts = Vec::new();
    let mut last = usize::MAX;
    for threshold in [0.5, 0.7, 0.8, 0.85, 0.9, 0.95, 0.99] {
        let pipeline =
            Pipeline::in_memory().with_match_config(MatchConfig::new().with_threshold(threshold));
        let report = pipeline.run(records()).unwrap();
        assert!(
            report.groups.verified <= last,
            "threshold {threshold} verified {} > {last}",
            report.groups.verified
        );
        last = report.groups.verified;
        counts.push(last);
    }
    // Loose thresholds also accept the Vandelay pair (0.84).
    assert!(counts[0] >= 5, "{counts:?}");
    assert!(counts[counts.len() - 1] >= 3, "{counts:?}");
    assert!(counts[0] > counts[counts.len() - 1], "{counts:?}");
}
