use std::path::PathBuf;

use acctmap_recon::config::ReconConfig;
use acctmap_recon::model::{RawTable, NOT_AVAILABLE};
use acctmap_recon::{load, load_source, reconcile, Query, ReconError, SearchIndex};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn keys(records: &[acctmap_recon::UnifiedRecord<'_>]) -> Vec<String> {
    records.iter().map(|r| r.account_no().to_string()).collect()
}

// -------------------------------------------------------------------------
// In-memory pipeline
// -------------------------------------------------------------------------

#[test]
fn end_to_end_single_account() {
    let legacy = RawTable::from_text_rows(
        &["LEGACYACCTID", "ACCTID", "NAME"],
        &[&["500.0", "L1", "John"]],
    );
    let current = RawTable::from_text_rows(
        &["ACCOUNT_NO", "NAME", "METER_NUMBER"],
        &[&["500", "J. Smith", "MTR9"]],
    );

    let table = reconcile(&ReconConfig::default(), legacy, current).unwrap();
    assert_eq!(table.len(), 1);

    let rec = table.record(0);
    assert_eq!(rec.account_no(), "500");
    assert_eq!(rec.legacy_id(), Some("L1"));
    assert_eq!(rec.name(), Some("J. Smith"));
    assert_eq!(rec.final_meter(), Some("MTR9"));

    let index = SearchIndex::build(&table);
    let hits = acctmap_recon::search(&table, &index, &Query::new("MTR9").unwrap());
    assert_eq!(keys(&hits), vec!["500"]);
    let hits = acctmap_recon::search(&table, &index, &Query::new("nomatch").unwrap());
    assert!(hits.is_empty());
}

#[test]
fn two_empty_sources() {
    let legacy = RawTable::from_text_rows(&["ACCTID", "LEGACYACCTID"], &[]);
    let current = RawTable::from_text_rows(&["ACCOUNT_NO", "NAME"], &[]);
    let table = reconcile(&ReconConfig::default(), legacy, current).unwrap();
    assert!(table.is_empty());

    let index = SearchIndex::build(&table);
    assert!(acctmap_recon::search(&table, &index, &Query::new("anything").unwrap()).is_empty());
}

#[test]
fn legacy_rows_without_account_stay_searchable() {
    let legacy = RawTable::from_text_rows(
        &["ACCTID", "LEGACYACCTID", "NAME"],
        &[&["L5", "", "Kaur"], &["L6", "", "Singh"]],
    );
    let current = RawTable::from_text_rows(&["ACCOUNT_NO", "NAME"], &[&["", "Unrelated"]]);

    let table = reconcile(&ReconConfig::default(), legacy, current).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.stats.unkeyed, 3);

    let index = SearchIndex::build(&table);
    let hits = acctmap_recon::search(&table, &index, &Query::new("L6").unwrap());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name(), Some("Singh"));

    let l5 = table.records().find(|r| r.legacy_id() == Some("L5")).unwrap();
    assert_eq!(l5.name(), Some("Kaur"));
    let unrelated = acctmap_recon::search(&table, &index, &Query::new("unrelated").unwrap());
    assert_eq!(unrelated.len(), 1);
    assert_eq!(unrelated[0].legacy_id(), None);
}

#[test]
fn overlong_row_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data2.csv");
    std::fs::write(&path, "ACCOUNT_NO,NAME\n500,Asha,EXTRA,MORE\n").unwrap();
    let err = load_source(&path).unwrap_err();
    assert!(matches!(err, ReconError::SourceUnavailable { .. }));
    assert!(err.to_string().contains("expected 2 fields, found 4"));
}

// -------------------------------------------------------------------------
// Fixture files
// -------------------------------------------------------------------------

#[test]
fn fixtures_outer_join() {
    let dataset = load(&ReconConfig::default(), &fixtures_dir()).unwrap();
    let table = &dataset.table;

    let all: Vec<_> = table.records().map(|r| r.account_no()).collect();
    assert_eq!(all, vec!["500", "501", "502", "777", "900"]);

    assert_eq!(table.stats.matched, 3);
    assert_eq!(table.stats.left_only, 1);
    assert_eq!(table.stats.right_only, 1);

    // 500: current name wins, current address empty -> legacy address
    let r500 = table.find("500").unwrap();
    assert_eq!(r500.name(), Some("J. Smith"));
    assert_eq!(r500.address(), Some("Old Ward 1"));
    assert_eq!(r500.legacy_id(), Some("L1"));
    assert_eq!(r500.get("NAME_f1"), Some("John"));
    assert_eq!(r500.get("Village/MRU"), Some("SANGRUR-01"));

    // 501: current name empty -> legacy name
    let r501 = table.find("501").unwrap();
    assert_eq!(r501.name(), Some("Harjit Kaur"));
    assert_eq!(r501.address(), Some("House 12 Sangrur"));

    // 502: key had surrounding spaces in the legacy file; meter empty
    let r502 = table.find("502").unwrap();
    assert_eq!(r502.legacy_id(), Some("L3"));
    assert_eq!(r502.final_meter(), Some(NOT_AVAILABLE));

    // current-only and legacy-only rows
    let r777 = table.find("777").unwrap();
    assert_eq!(r777.legacy_id(), None);
    assert_eq!(r777.final_meter(), Some("MTR77"));
    let r900 = table.find("900").unwrap();
    assert_eq!(r900.name(), Some("Orphan Legacy"));
    assert_eq!(r900.get("LATITUDE"), None);
    assert_eq!(r900.get("Village/MRU"), None);
}

#[test]
fn fixtures_search() {
    let dataset = load(&ReconConfig::default(), &fixtures_dir()).unwrap();

    let hits = dataset.search(&Query::new("sangrur").unwrap());
    assert_eq!(keys(&hits), vec!["500", "501"]);

    // Legacy-only column values are searchable too
    let hits = dataset.search(&Query::new("dhuri").unwrap());
    assert_eq!(keys(&hits), vec!["900"]);

    // Suffixed legacy name still matches after the current name wins
    let hits = dataset.search(&Query::new("JOHN").unwrap());
    assert_eq!(keys(&hits), vec!["500"]);

    let again = dataset.search(&Query::new("JOHN").unwrap());
    assert_eq!(hits, again);
}

#[test]
fn fixtures_serial_meter_config() {
    let dir = fixtures_dir();
    let config = ReconConfig::from_path(&dir.join("serial.acctmap.toml")).unwrap();
    let dataset = load(&config, &dir).unwrap();
    let table = &dataset.table;

    assert!(!table.has_column("METER_NUMBER"));
    assert_eq!(table.find("500").unwrap().final_meter(), Some("SER-500"));
    assert_eq!(table.find("501").unwrap().final_meter(), Some(NOT_AVAILABLE));
    assert_eq!(table.find("900").unwrap().final_meter(), Some(NOT_AVAILABLE));
}

#[test]
fn load_source_reads_raw_headers() {
    let raw = load_source(&fixtures_dir().join("data1.csv")).unwrap();
    assert_eq!(raw.headers[0], "ACCTID ");
    assert_eq!(raw.len(), 4);
}

#[test]
fn missing_source_is_fatal() {
    let mut config = ReconConfig::default();
    config.sources.current.file = "does-not-exist.csv".into();
    let err = load(&config, &fixtures_dir()).unwrap_err();
    match err {
        ReconError::SourceUnavailable { source, .. } => {
            assert!(source.ends_with("does-not-exist.csv"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
