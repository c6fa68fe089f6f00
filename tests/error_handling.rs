use firmclust::{
    BlockingConfig, ConfigLoadError, FirmclustConfig, IndexError, IngestConfig, IngestError,
    MatchConfig, MatchError, NormalizerConfig, PerceptualError, Pipeline, PipelineError,
    RawNameRecord, SqliteStore, Stage, Table, TableStore,
};
use tempfile::TempDir;

fn acme() -> Vec<RawNameRecord> {
    vec![
        RawNameRecord::new("s", "1", "Acme Corp"),
        RawNameRecord::new("s", "2", "ACME CORPORATION"),
        RawNameRecord::new("s", "3", "Zenith LLC"),
    ]
}

#[test]
fn record_without_source_fails_unique_names() {
    let pipeline = Pipeline::in_memory();
    let err = pipeline
        .unique_names(vec![
            RawNameRecord::new("s", "1", "Acme"),
            RawNameRecord::new("  ", "2", "Zenith"),
        ])
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::UniqueNames(IngestError::MissingField {
            field: "source",
            position: 1,
        })
    );
    assert_eq!(err.stage(), Some(Stage::UniqueNames));
    assert!(!pipeline.store().has_table(Table::Name).unwrap());
}

#[test]
fn duplicate_records_are_rejected_when_configured() {
    let pipeline = Pipeline::in_memory()
        .with_ingest_config(IngestConfig::new().with_reject_duplicate_records(true));
    let err = pipeline
        .unique_names(vec![
            RawNameRecord::new("s", "1", "Acme"),
            RawNameRecord::new("s", "1", "Acme Inc"),
        ])
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::UniqueNames(IngestError::DuplicateRecord { .. })
    ));
}

#[test]
fn invalid_blocking_config_fails_filter_pairs_without_writing() {
    let pipeline = Pipeline::in_memory().with_blocking_config(BlockingConfig::new().with_k(0));
    pipeline.unique_names(acme()).unwrap();
    let err = pipeline.filter_pairs().unwrap_err();
    assert_eq!(
        err,
        PipelineError::FilterPairs(PerceptualError::InvalidConfigK { k: 0 })
    );
    assert!(!pipeline.store().has_table(Table::Pair).unwrap());
}

#[test]
fn invalid_threshold_fails_find_groups() {
    let pipeline =
        Pipeline::in_memory().with_match_config(MatchConfig::new().with_threshold(1.5));
    pipeline.unique_names(acme()).unwrap();
    pipeline.filter_pairs().unwrap();
    let err = pipeline.find_groups().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::FindGroups(MatchError::InvalidConfig(_))
    ));
    assert!(err.to_string().starts_with("find_groups failed"));
}

#[test]
fn merge_rechecks_offset_against_stored_matches() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("firms.db");
    let open = || Box::new(SqliteStore::open(&path).unwrap());

    let grouping = Pipeline::new(open());
    grouping.unique_names(acme()).unwrap();
    grouping.filter_pairs().unwrap();
    grouping.find_groups().unwrap();

    // A later invocation with a smaller offset must not mint colliding ids.
    let merging =
        Pipeline::new(open()).with_match_config(MatchConfig::new().with_base_offset(1));
    let err = merging.merge_firms().unwrap_err();
    assert_eq!(
        err,
        PipelineError::MergeFirms(MatchError::OffsetTooSmall {
            base_offset: 1,
            components: 1,
        })
    );
    assert!(!merging.store().has_table(Table::Firm).unwrap());
    assert!(!merging.store().has_table(Table::RecordFirm).unwrap());
}

#[test]
fn stages_out_of_order_name_the_missing_table() {
    let pipeline = Pipeline::in_memory();
    assert_eq!(
        pipeline.find_groups().unwrap_err(),
        PipelineError::Store {
            stage: Stage::FindGroups,
            source: IndexError::MissingTable(Table::Pair),
        }
    );
    let err = pipeline.merge_firms().unwrap_err();
    assert_eq!(err.stage(), Some(Stage::MergeFirms));
    assert!(err.to_string().contains("table name has not been written yet"));
}

#[test]
fn failed_stage_keeps_previous_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("firms.db");
    let open = || Box::new(SqliteStore::open(&path).unwrap());

    let good = Pipeline::new(open());
    good.run(acme()).unwrap();
    let pairs = good.store().load_pairs().unwrap();
    assert_eq!(pairs.len(), 1);

    let broken = Pipeline::new(open()).with_blocking_config(BlockingConfig::new().with_bands(0));
    assert!(matches!(
        broken.filter_pairs(),
        Err(PipelineError::FilterPairs(PerceptualError::InvalidConfigBands { bands: 0 }))
    ));
    assert_eq!(broken.store().load_pairs().unwrap(), pairs);
}

#[test]
fn invalid_normalizer_config_is_reported() {
    let cfg = FirmclustConfig {
        canonical: NormalizerConfig::new().with_corporate_suffixes(["CO LTD"]),
        ..FirmclustConfig::default()
    };
    let err = Pipeline::from_config(&cfg).err().unwrap();
    assert!(matches!(err, PipelineError::Normalizer(_)));
    assert_eq!(err.stage(), None);
}

#[test]
fn bad_yaml_is_a_config_error() {
    let err = FirmclustConfig::from_yaml("version: [1").unwrap_err();
    assert!(matches!(err, ConfigLoadError::YamlParse(_)));

    let err = FirmclustConfig::from_yaml("version: \"1.0\"\nmatching:\n  base_offset: 0\n")
        .unwrap_err();
    assert!(err.to_string().contains("base_offset"));
}
