//! Batch runner for unattended scenario runs.
//!
//! Runs every catalog entry through the pipeline in fixed-size chunks:
//! simulate to completion, take the first and last snapshot, extract a
//! feature row and submit it to the aggregator. Runs inside a chunk are
//! strictly sequential; between chunks the runner sleeps to throttle writes
//! to the shared aggregator. A failure affects only its own scenario.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sortie_core::driver::ClockDriver;
use sortie_core::error::EngineError;
use sortie_core::game::Game;
use sortie_core::playback::{DirectorySink, PlaybackRecorder};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::aggregator::{submit_feature_row, Aggregator};
use crate::catalog::{CatalogEntry, ScenarioCatalog};
use crate::config::BatchConfig;
use crate::features::{process_recourse_data, ExtractError, FeatureRow};

/// Error for a single scenario run, before submission.
#[derive(Error, Debug)]
pub enum RunError {
    /// The definition failed to load.
    #[error("Scenario failed to load: {0}")]
    Engine(#[from] EngineError),
    /// The recorder captured nothing.
    #[error("Recording is empty")]
    EmptyRecording,
    /// Feature extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl RunError {
    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> BatchStage {
        match self {
            Self::Engine(_) => BatchStage::Simulation,
            Self::EmptyRecording | Self::Extract(_) => BatchStage::Extraction,
        }
    }
}

/// Result of simulating one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// Catalog entry name.
    pub name: String,
    /// Ticks taken.
    pub steps: u64,
    /// Whether a termination condition ended the run.
    pub has_game_ended: bool,
    /// Exported recording file, when exports are enabled.
    pub recording_file: Option<String>,
    /// Extracted row; `None` for unfinished runs.
    pub row: Option<FeatureRow>,
}

/// Simulate one catalog entry and extract its feature row.
pub fn run_scenario(entry: &CatalogEntry, config: &BatchConfig) -> Result<ScenarioRun, RunError> {
    let scenario = entry.instantiate()?;
    let mut recorder = PlaybackRecorder::new(config.record_every_seconds);
    if let Some(dir) = &config.recording_dir {
        recorder = recorder.with_sink(DirectorySink::new(dir));
    }

    let mut game = Game::new(scenario, ClockDriver::new(), recorder).with_max_steps(config.max_steps);
    game.start_recording();
    let summary = game.run();

    let end_time = game.scenario().current_time;
    let recording_file = if config.recording_dir.is_some() {
        match game.recorder_mut().export_recording(end_time, None) {
            Ok(file) => file,
            Err(e) => {
                warn!(scenario = %entry.name, "Failed to export recording: {}", e);
                None
            }
        }
    } else {
        None
    };

    let lines = game
        .recorder()
        .export_recourse_recording(end_time, None, summary.has_game_ended)
        .ok_or(RunError::EmptyRecording)?;
    let row = process_recourse_data(&lines, &config.thresholds)?.map(|mut row| {
        row.scenario_name.clone_from(&entry.name);
        row
    });

    Ok(ScenarioRun {
        name: entry.name.clone(),
        steps: summary.steps,
        has_game_ended: summary.has_game_ended,
        recording_file,
        row,
    })
}

/// Pipeline stage of a batch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStage {
    /// Loading or simulating the scenario.
    Simulation,
    /// Reading the recording.
    Extraction,
    /// Talking to the aggregator.
    Submission,
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Catalog entry name
    pub scenario: String,
    /// Stage that failed
    pub stage: BatchStage,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Scenarios simulated
    pub scenarios_run: usize,
    /// Rows the aggregator accepted
    pub rows_submitted: usize,
    /// Runs that did not end and were discarded
    pub unfinished: usize,
    /// Errors encountered
    pub errors: Vec<BatchError>,
    /// Pauses issued between chunks
    pub chunk_pauses: usize,
    /// Total runtime
    pub duration_seconds: f64,
}

impl BatchReport {
    /// Save report to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load report from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    fn record_error(&mut self, scenario: &str, stage: BatchStage, message: String) {
        self.errors.push(BatchError {
            scenario: scenario.to_string(),
            stage,
            message,
        });
    }
}

/// Run the whole catalog in throttled chunks.
pub async fn run_batch<A: Aggregator>(
    catalog: &ScenarioCatalog,
    config: &BatchConfig,
    aggregator: &A,
) -> BatchReport {
    let start = Instant::now();
    let mut report = BatchReport::default();
    let chunk_size = config.chunk_size.max(1);
    let chunk_count = catalog.len().div_ceil(chunk_size);

    info!(
        "Starting batch run: {} scenarios in {} chunks of {}",
        catalog.len(),
        chunk_count,
        chunk_size
    );

    for (index, chunk) in catalog.entries().chunks(chunk_size).enumerate() {
        if index > 0 {
            debug!(delay_ms = config.chunk_delay_ms, "Pausing between chunks");
            tokio::time::sleep(config.chunk_delay()).await;
            report.chunk_pauses += 1;
        }
        info!(chunk = index + 1, of = chunk_count, size = chunk.len(), "Chunk starts");

        for entry in chunk {
            let run = match run_scenario(entry, config) {
                Ok(run) => run,
                Err(e) => {
                    error!(scenario = %entry.name, "Scenario run failed: {}", e);
                    report.record_error(&entry.name, e.stage(), e.to_string());
                    continue;
                }
            };
            report.scenarios_run += 1;

            let Some(row) = run.row else {
                report.unfinished += 1;
                continue;
            };
            match submit_feature_row(aggregator, &row).await {
                Ok(_) => report.rows_submitted += 1,
                Err(e) => {
                    error!(scenario = %entry.name, "Failed to update aggregator: {}", e);
                    report.record_error(&entry.name, BatchStage::Submission, e.to_string());
                }
            }
        }

        info!(chunk = index + 1, of = chunk_count, "Chunk finished");
    }

    report.duration_seconds = start.elapsed().as_secs_f64();
    info!(
        "Batch complete: {} scenarios, {} rows submitted, {} unfinished, {} errors in {:.1}s",
        report.scenarios_run,
        report.rows_submitted,
        report.unfinished,
        report.errors.len(),
        report.duration_seconds
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MemoryAggregator;
    use sortie_test_utils::fixtures::engagement_scenario;

    fn entry(name: &str) -> CatalogEntry {
        let mut scenario = engagement_scenario(name);
        scenario.time_compression = 60;
        CatalogEntry::from_source(name, format!("{name}.json"), scenario.to_snapshot_line().unwrap())
    }

    #[test]
    fn test_run_scenario_extracts_row() {
        let run = run_scenario(&entry("Single"), &BatchConfig::default()).unwrap();
        assert!(run.has_game_ended);
        assert_eq!(run.steps, 60);
        let row = run.row.unwrap();
        assert_eq!(row.scenario_name, "Single");
        assert_eq!(row.side_a.outcome, 1);
        assert_eq!(row.side_b.outcome, 0);
        assert!(run.recording_file.is_none());
    }

    #[test]
    fn test_run_scenario_unfinished_has_no_row() {
        let config = BatchConfig::default().with_max_steps(5);
        let run = run_scenario(&entry("Bounded"), &config).unwrap();
        assert!(!run.has_game_ended);
        assert_eq!(run.steps, 5);
        assert!(run.row.is_none());
    }

    #[test]
    fn test_run_scenario_exports_recording() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig::default().with_recording_dir(dir.path());
        let run = run_scenario(&entry("Exported"), &config).unwrap();
        let file = run.recording_file.unwrap();
        assert!(file.starts_with("Exported Recording "));
        assert!(dir.path().join(file).exists());
    }

    #[test]
    fn test_broken_entry_is_a_simulation_error() {
        let broken = CatalogEntry::from_source("broken", "broken.json", "{ nope");
        let err = run_scenario(&broken, &BatchConfig::default()).unwrap_err();
        assert_eq!(err.stage(), BatchStage::Simulation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_pauses() {
        let catalog = ScenarioCatalog::from_entries((0..5).map(|i| entry(&format!("s{i}"))).collect());
        let config = BatchConfig::default().with_chunking(2, 1000);
        let aggregator = MemoryAggregator::new();
        let report = run_batch(&catalog, &config, &aggregator).await;
        assert_eq!(report.chunk_pauses, 2);
        assert_eq!(report.scenarios_run, 5);
        assert_eq!(report.rows_submitted, 5);
        assert_eq!(aggregator.rows().len(), 5);
    }

    #[test]
    fn test_report_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("batch.json");
        let report = BatchReport {
            scenarios_run: 3,
            rows_submitted: 2,
            unfinished: 1,
            errors: vec![BatchError {
                scenario: "s1".into(),
                stage: BatchStage::Submission,
                message: "Server error: 500 - boom".into(),
            }],
            chunk_pauses: 0,
            duration_seconds: 0.5,
        };
        report.save(&path).unwrap();
        assert_eq!(BatchReport::load(&path).unwrap(), report);
    }
}
