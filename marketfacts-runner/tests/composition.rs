//! End-to-end composition: TOML config → registry → CSV store → use cases
//! and pipeline.

use chrono::{DateTime, Duration, TimeZone, Utc};
use marketfacts_core::data::{CsvFactStore, Payload, PriceQuery, TimeWindow};
use marketfacts_core::domain::{Interval, PriceBarFact, RawPriceBar};
use marketfacts_runner::{
    BuildAssetWithPrices, GetPricesMultipleIdentities, PipelineDataset, PriceDataset,
    PricesQuery, RunnerConfig, SourceRegistry, StageOutcome,
};
use std::path::Path;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
}

fn series(code: &str, days: i64) -> Vec<PriceBarFact> {
    (0..days)
        .map(|d| {
            RawPriceBar::new(code, "1d", t0() + Duration::days(d), 50 + d)
                .volume(100 + d)
                .build()
                .unwrap()
        })
        .collect()
}

fn config_for(dir: &Path, policy: &str) -> RunnerConfig {
    RunnerConfig::from_toml(&format!(
        r#"
        data_dir = "{}"
        failure_policy = "{policy}"

        [[sources]]
        id = "disk"
        kind = "local_csv"
        "#,
        dir.display()
    ))
    .unwrap()
}

#[test]
fn configured_store_feeds_multi_identity_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFactStore::new(dir.path());
    store.save("VALE3", &series("VALE3", 3)).unwrap();
    store.save("PETR4", &series("PETR4", 2)).unwrap();

    let config = config_for(dir.path(), "skip_and_log");
    let sources = SourceRegistry::with_defaults().resolve(&config).unwrap();
    let repo = sources.get("disk").unwrap();

    let dto = PricesQuery::new(["PETR4", "ITUB4", "VALE3"], Interval::Day1, t0(), None);
    let out = GetPricesMultipleIdentities::new(repo)
        .policy(config.failure_policy)
        .verify_identity(config.verify_identity)
        .execute(&dto)
        .unwrap();

    let codes: Vec<_> = out.prices.iter().map(|b| b.code()).collect();
    assert_eq!(codes, vec!["PETR4", "PETR4", "VALE3", "VALE3", "VALE3"]);
    // a code with no file is an empty answer, not a failure
    assert!(out.is_complete());
}

#[test]
fn configured_store_builds_asset() {
    let dir = tempfile::tempdir().unwrap();
    let mut stored = series("PETR4", 4);
    stored.reverse();
    CsvFactStore::new(dir.path()).save("PETR4", &stored).unwrap();

    let config = config_for(dir.path(), "fail_fast");
    let repo = SourceRegistry::with_defaults()
        .resolve(&config)
        .unwrap()
        .get("disk")
        .unwrap();

    let query = PriceQuery::new("PETR4", Interval::Day1, TimeWindow::since(t0())).unwrap();
    let asset = BuildAssetWithPrices::new(repo).execute(&query).unwrap();
    assert_eq!(asset.prices(), &series("PETR4", 4)[..]);
}

#[test]
fn pipeline_merges_stored_series_and_reports_empties() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFactStore::new(dir.path());
    store.save("PETR4", &series("PETR4", 2)).unwrap();
    store.save("VALE3", &series("VALE3", 3)).unwrap();

    let config = config_for(dir.path(), "fail_fast");
    let repo = SourceRegistry::with_defaults()
        .resolve(&config)
        .unwrap()
        .get("disk")
        .unwrap();

    let stage = |code: &str| {
        let query = PriceQuery::new(code, Interval::Day1, TimeWindow::since(t0())).unwrap();
        PriceDataset::new(repo.clone(), query)
    };

    let report = PipelineDataset::new()
        .with_stage(stage("PETR4"))
        .with_stage(stage("ITUB4"))
        .with_stage(stage("VALE3"))
        .run()
        .unwrap();

    let outcomes: Vec<_> = report.stages.iter().map(|s| &s.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            &StageOutcome::Loaded { rows: 2 },
            &StageOutcome::Empty,
            &StageOutcome::Loaded { rows: 3 },
        ]
    );
    assert_eq!(report.stages[0].stage, "local_csv:PETR4:1d");

    let batch = report.batch.unwrap();
    assert_eq!(batch.rows(), 5);
    assert_eq!(batch.meta.source, "local_csv");
    assert_eq!(batch.meta.labels.get("code").map(String::as_str), Some("PETR4"));
    assert!(matches!(batch.payload, Payload::Frame(_)));
}

#[test]
fn corrupt_store_file_fails_only_its_stage() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFactStore::new(dir.path());
    store.save("PETR4", &series("PETR4", 2)).unwrap();
    std::fs::write(dir.path().join("VALE3.csv"), "not,a,valid,header\n").unwrap();

    let repo = SourceRegistry::with_defaults()
        .resolve(&config_for(dir.path(), "fail_fast"))
        .unwrap()
        .get("disk")
        .unwrap();
    let stage = |code: &str| {
        let query = PriceQuery::new(code, Interval::Day1, TimeWindow::since(t0())).unwrap();
        PriceDataset::new(repo.clone(), query)
    };

    let report = PipelineDataset::new()
        .with_stage(stage("VALE3"))
        .with_stage(stage("PETR4"))
        .run()
        .unwrap();

    assert!(matches!(report.stages[0].outcome, StageOutcome::Failed { .. }));
    assert_eq!(report.stages[1].outcome, StageOutcome::Loaded { rows: 2 });
    assert_eq!(report.batch.map(|b| b.rows()), Some(2));
}
