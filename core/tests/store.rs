//! Run store: upsert-by-date persistence in SQLite.

use chrono::NaiveDate;
use grading_core::{
    allocator::ThresholdMap,
    config::GradingConfig,
    engine::GradingEngine,
    store::GradingStore,
    synthetic::synthetic_population,
};

fn store() -> GradingStore {
    let store = GradingStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn engine() -> GradingEngine {
    GradingEngine::new(GradingConfig::default_test()).expect("engine")
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

#[test]
fn saving_a_run_writes_detail_and_cut_lines() {
    let store = store();
    let engine = engine();
    let (record, summary) = engine.run_optimized(synthetic_population(200, 5), date(1)).unwrap();
    engine.commit(&store, &record, &summary).unwrap();

    assert_eq!(store.detail_count_for_date("2026-10-01").unwrap(), 200);
    assert_eq!(store.run_count_for_date("2026-10-01").unwrap(), 1);

    let lines = store.tier_lines_for_date("2026-10-01").unwrap();
    assert_eq!(lines.len(), 30);
    assert_eq!(lines[0].tier, 30);
    assert_eq!(lines[0].label, "三十档");
    assert_eq!(lines[0].score, summary.tiers[0].cut_line);

    let stored = store.run_for_date("2026-10-01").unwrap().expect("stored run");
    assert_eq!(stored.run_id, record.run_id);
    assert_eq!(stored.date_key, date(1));
    assert_eq!(stored.tiered.tiers(), record.tiered.tiers());
}

#[test]
fn saving_again_replaces_the_date() {
    let store = store();
    let engine = engine();

    let (first, first_summary) = engine.run_optimized(synthetic_population(200, 5), date(2)).unwrap();
    engine.commit(&store, &first, &first_summary).unwrap();
    let (second, second_summary) = engine.run_optimized(synthetic_population(150, 6), date(2)).unwrap();
    engine.commit(&store, &second, &second_summary).unwrap();

    assert_eq!(
        store.detail_count_for_date("2026-10-02").unwrap(),
        150,
        "the second save must replace, not append"
    );
    assert_eq!(store.run_count_for_date("2026-10-02").unwrap(), 1);
    assert_eq!(store.tier_lines_for_date("2026-10-02").unwrap().len(), 30);
    let stored = store.run_for_date("2026-10-02").unwrap().expect("stored run");
    assert_eq!(stored.run_id, second.run_id);
}

#[test]
fn dates_are_independent() {
    let store = store();
    let engine = engine();

    let (a, a_summary) = engine.run_optimized(synthetic_population(120, 1), date(3)).unwrap();
    engine.commit(&store, &a, &a_summary).unwrap();
    let thresholds = ThresholdMap::from([(30, 90.0), (20, 70.0)]);
    let (b, b_summary) = engine
        .run_thresholds(synthetic_population(80, 2), &thresholds, date(4))
        .unwrap();
    engine.commit(&store, &b, &b_summary).unwrap();

    assert_eq!(store.stored_dates().unwrap(), vec!["2026-10-03", "2026-10-04"]);
    assert_eq!(store.detail_count_for_date("2026-10-03").unwrap(), 120);
    assert_eq!(store.detail_count_for_date("2026-10-04").unwrap(), 80);

    let stored = store.run_for_date("2026-10-04").unwrap().expect("stored run");
    assert_eq!(stored.method.name(), "thresholds");
}

#[test]
fn unknown_date_is_empty() {
    let store = store();
    assert!(store.run_for_date("1999-01-01").unwrap().is_none());
    assert_eq!(store.detail_count_for_date("1999-01-01").unwrap(), 0);
    assert!(store.tier_lines_for_date("1999-01-01").unwrap().is_empty());
    assert!(store.stored_dates().unwrap().is_empty());
}

#[test]
fn preview_touches_nothing() {
    let store = store();
    let engine = engine();
    let thresholds = ThresholdMap::from([(25, 80.0)]);
    let (tiered, summary) = engine.preview_thresholds(synthetic_population(60, 3), &thresholds).unwrap();
    assert_eq!(tiered.len(), 60);
    assert_eq!(summary.tiers.len(), 30);
    assert!(store.stored_dates().unwrap().is_empty());
}

#[test]
fn file_backed_store_persists_across_connections() {
    let path = std::env::temp_dir().join(format!("grading-store-{}.db", std::process::id()));
    let path_str = path.to_str().unwrap().to_string();
    std::fs::remove_file(&path).ok();

    let engine = engine();
    let (record, summary) = engine.run_optimized(synthetic_population(90, 7), date(5)).unwrap();
    {
        let store = GradingStore::open(&path_str).expect("file store");
        store.migrate().unwrap();
        engine.commit(&store, &record, &summary).unwrap();
    }
    let reopened = GradingStore::open(&path_str).expect("reopen");
    reopened.migrate().unwrap();
    assert_eq!(reopened.detail_count_for_date("2026-10-05").unwrap(), 90);
    drop(reopened);

    for suffix in ["", "-wal", "-shm"] {
        std::fs::remove_file(format!("{path_str}{suffix}")).ok();
    }
}

#[test]
fn open_accepts_in_memory_path() {
    let store = GradingStore::open(":memory:").expect("memory path");
    store.migrate().unwrap();
    assert!(store.stored_dates().unwrap().is_empty());
}
