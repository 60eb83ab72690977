//! End-to-end batch pipeline tests.
//!
//! Scenario files on disk, loaded into a catalog, run in chunks and
//! submitted to in-memory or CSV aggregators.

use std::fs;
use std::path::Path;

use sortie_core::prelude::*;
use sortie_headless::{
    run_batch, BatchConfig, BatchStage, CsvFileAggregator, FeatureRow, MemoryAggregator,
    ScenarioCatalog,
};
use sortie_test_utils::fixtures::{engagement_scenario, two_side_scenario};

fn write_scenario(dir: &Path, file: &str, scenario: &Scenario) {
    fs::write(dir.join(file), scenario.to_snapshot_line().unwrap()).unwrap();
}

fn quick_engagement(name: &str) -> Scenario {
    let mut scenario = engagement_scenario(name);
    scenario.time_compression = 60;
    scenario
}

fn quick_config() -> BatchConfig {
    BatchConfig::default().with_chunking(10, 0)
}

#[tokio::test]
async fn twenty_five_scenarios_pause_twice_with_chunks_of_ten() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..25 {
        write_scenario(dir.path(), &format!("s{i:02}.json"), &quick_engagement(&format!("s{i:02}")));
    }
    let catalog = ScenarioCatalog::load_from_directory(dir.path()).unwrap();
    assert_eq!(catalog.len(), 25);

    let aggregator = MemoryAggregator::new();
    let report = run_batch(&catalog, &quick_config(), &aggregator).await;

    assert_eq!(report.chunk_pauses, 2);
    assert_eq!(report.scenarios_run, 25);
    assert_eq!(report.rows_submitted, 25);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn rejected_rows_do_not_abort_the_batch() {
    let catalog = ScenarioCatalog::from_entries(
        (0..3)
            .map(|i| {
                let scenario = quick_engagement(&format!("r{i}"));
                sortie_headless::CatalogEntry::from_source(
                    scenario.name.clone(),
                    format!("r{i}.json"),
                    scenario.to_snapshot_line().unwrap(),
                )
            })
            .collect(),
    );
    let aggregator = MemoryAggregator::new().rejecting(500, "disk full");
    let report = run_batch(&catalog, &quick_config(), &aggregator).await;

    assert_eq!(report.scenarios_run, 3);
    assert_eq!(report.rows_submitted, 0);
    assert_eq!(report.errors.len(), 3);
    assert!(report
        .errors
        .iter()
        .all(|e| e.stage == BatchStage::Submission && e.message.contains("disk full")));
}

#[tokio::test]
async fn empty_header_schema_skips_every_submission() {
    let dir = tempfile::tempdir().unwrap();
    write_scenario(dir.path(), "one.json", &quick_engagement("one"));
    let catalog = ScenarioCatalog::load_from_directory(dir.path()).unwrap();

    let aggregator = MemoryAggregator::new().with_headers(Vec::new());
    let report = run_batch(&catalog, &quick_config(), &aggregator).await;

    assert_eq!(report.rows_submitted, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(aggregator.rows().is_empty());
}

#[tokio::test]
async fn unfinished_runs_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    write_scenario(dir.path(), "long.json", &quick_engagement("long"));
    let catalog = ScenarioCatalog::load_from_directory(dir.path()).unwrap();

    let config = quick_config().with_max_steps(3);
    let aggregator = MemoryAggregator::new();
    let report = run_batch(&catalog, &config, &aggregator).await;

    assert_eq!(report.scenarios_run, 1);
    assert_eq!(report.unfinished, 1);
    assert_eq!(report.rows_submitted, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn already_decided_scenario_still_produces_a_row() {
    let mut scenario = two_side_scenario("decided");
    scenario.current_time = scenario.end_time;
    let dir = tempfile::tempdir().unwrap();
    write_scenario(dir.path(), "decided.json", &scenario);
    let catalog = ScenarioCatalog::load_from_directory(dir.path()).unwrap();

    let aggregator = MemoryAggregator::new();
    let report = run_batch(&catalog, &quick_config(), &aggregator).await;

    assert_eq!(report.rows_submitted, 1);
    let rows = aggregator.rows();
    assert_eq!(rows[0]["side_a_outcome"], 0);
    assert_eq!(rows[0]["side_a_total_ships"], 0);
}

#[tokio::test]
async fn csv_aggregator_collects_rows_with_one_header() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["alpha", "bravo"] {
        write_scenario(dir.path(), &format!("{name}.json"), &quick_engagement(name));
    }
    let catalog = ScenarioCatalog::load_from_directory(dir.path()).unwrap();
    let csv_path = dir.path().join("out").join("algo_recourse_results.csv");
    let aggregator = CsvFileAggregator::new(&csv_path);

    let report = run_batch(&catalog, &quick_config(), &aggregator).await;
    assert_eq!(report.rows_submitted, 2);

    let contents = fs::read_to_string(&csv_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next().unwrap(), FeatureRow::schema().join(","));
    assert_eq!(lines.count(), 2);
    // Side A completes its patrol without losses; side B's strike never lands.
    assert!(contents.lines().skip(1).all(|line| line.starts_with("1,0,")));
}

#[test]
fn config_file_drives_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batch.ron");
    fs::write(
        &path,
        r#"(
            scenario_dir: "scenarios/strait",
            chunk_size: 3,
            chunk_delay_ms: 250,
            aggregator_url: "http://aggregator.local:8009/",
            thresholds: (max_casualty_rate: 0.4, min_mission_success_rate: 0.8),
            report_path: Some("results/batch.json"),
        )"#,
    )
    .unwrap();

    let config = BatchConfig::load(&path).unwrap();
    assert_eq!(config.chunk_size, 3);
    assert_eq!(config.chunk_delay_ms, 250);
    assert_eq!(config.thresholds.label(0.39, 0.81), 1);
    assert_eq!(config.thresholds.label(0.45, 0.81), 0);
    assert_eq!(config.max_steps, 1_000_000);
    assert!(config.recording_dir.is_none());
}
