//! Headless scenario batch runner.
//!
//! # Usage
//!
//! ```bash
//! # Run the catalog through the pipeline, posting rows to the aggregator
//! cargo run -p sortie_headless -- batch --scenarios scenarios/ --report results/batch.json
//!
//! # Load settings from a RON file, overriding the chunk size
//! cargo run -p sortie_headless -- --config batch.ron batch --chunk-size 5
//!
//! # Run one scenario and export its recording
//! cargo run -p sortie_headless -- run scenarios/strait.json --recordings recordings/
//!
//! # Validate definitions
//! cargo run -p sortie_headless -- validate --scenarios scenarios/
//!
//! # Summarise the aggregated dataset
//! cargo run -p sortie_headless -- dataset
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the default level.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sortie_headless::{
    aggregator::{Aggregator, CsvFileAggregator, HttpAggregator},
    batch::{run_batch, run_scenario, BatchReport},
    catalog::{CatalogEntry, ScenarioCatalog},
    config::BatchConfig,
};

#[derive(Parser)]
#[command(name = "sortie")]
#[command(about = "Headless scenario runner producing outcome datasets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Batch configuration file (RON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every scenario in the catalog and submit feature rows
    Batch {
        /// Directory of scenario definitions
        #[arg(short, long)]
        scenarios: Option<PathBuf>,

        /// Scenarios per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Pause between chunks in milliseconds
        #[arg(long)]
        chunk_delay_ms: Option<u64>,

        /// Aggregator base URL
        #[arg(long)]
        aggregator: Option<String>,

        /// Append rows to a local CSV instead of posting them
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Export full recordings into this directory
        #[arg(long)]
        recordings: Option<PathBuf>,

        /// Write the batch report to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Run a single scenario and print its feature row
    Run {
        /// Scenario definition file
        scenario: PathBuf,

        /// Export the recording into this directory
        #[arg(long)]
        recordings: Option<PathBuf>,
    },

    /// Check scenario definitions for problems
    Validate {
        /// Directory of scenario definitions
        #[arg(short, long)]
        scenarios: Option<PathBuf>,
    },

    /// Summarise the aggregated dataset
    Dataset {
        /// Aggregator base URL
        #[arg(long)]
        aggregator: Option<String>,

        /// Read a local CSV instead of the aggregator
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            tracing::error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Batch {
            scenarios,
            chunk_size,
            chunk_delay_ms,
            aggregator,
            csv,
            recordings,
            report,
        } => {
            let mut config = config;
            if let Some(dir) = scenarios {
                config.scenario_dir = dir;
            }
            if let Some(size) = chunk_size {
                config.chunk_size = size;
            }
            if let Some(delay) = chunk_delay_ms {
                config.chunk_delay_ms = delay;
            }
            if let Some(url) = aggregator {
                config.aggregator_url = url;
            }
            if csv.is_some() {
                config.csv_output = csv;
            }
            if recordings.is_some() {
                config.recording_dir = recordings;
            }
            if report.is_some() {
                config.report_path = report;
            }
            cmd_batch(config).await
        }
        Commands::Run {
            scenario,
            recordings,
        } => {
            let mut config = config;
            if recordings.is_some() {
                config.recording_dir = recordings;
            }
            cmd_run(&scenario, &config)
        }
        Commands::Validate { scenarios } => {
            cmd_validate(scenarios.as_deref().unwrap_or(config.scenario_dir.as_path()))
        }
        Commands::Dataset { aggregator, csv } => {
            let url = aggregator.unwrap_or(config.aggregator_url);
            cmd_dataset(url, csv.or(config.csv_output)).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BatchConfig, String> {
    match path {
        Some(path) => {
            tracing::info!("Loading batch config from: {}", path.display());
            BatchConfig::load(path).map_err(|e| e.to_string())
        }
        None => Ok(BatchConfig::default()),
    }
}

/// Run the catalog through the pipeline
async fn cmd_batch(config: BatchConfig) -> Result<(), String> {
    config.validate().map_err(|e| e.to_string())?;
    let catalog = ScenarioCatalog::load_from_directory(&config.scenario_dir).map_err(|e| e.to_string())?;
    if catalog.is_empty() {
        return Err(format!("No scenarios found in {}", config.scenario_dir.display()));
    }

    tracing::info!(
        scenarios = catalog.len(),
        chunk_size = config.chunk_size,
        chunk_delay_ms = config.chunk_delay_ms,
        aggregator = %config.aggregator_url,
        csv_output = ?config.csv_output,
        recording_dir = ?config.recording_dir,
        "Batch configuration"
    );

    let report = match &config.csv_output {
        Some(path) => run_batch(&catalog, &config, &CsvFileAggregator::new(path)).await,
        None => {
            let aggregator = HttpAggregator::new(&config.aggregator_url).map_err(|e| e.to_string())?;
            run_batch(&catalog, &config, &aggregator).await
        }
    };

    if let Some(path) = &config.report_path {
        report
            .save(path)
            .map_err(|e| format!("Failed to save report to {}: {e}", path.display()))?;
        tracing::info!("Report saved to: {}", path.display());
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Scenarios run:  {}", report.scenarios_run);
    eprintln!("Rows submitted: {}", report.rows_submitted);
    eprintln!("Unfinished:     {}", report.unfinished);
    eprintln!("Chunk pauses:   {}", report.chunk_pauses);
    eprintln!("Duration:       {:.1}s", report.duration_seconds);

    if !report.errors.is_empty() {
        eprintln!("\nFAILURES:");
        for error in report.errors.iter().take(10) {
            eprintln!("  {} [{:?}]: {}", error.scenario, error.stage, error.message);
        }
        if report.errors.len() > 10 {
            eprintln!("  ... and {} more failures", report.errors.len() - 10);
        }
    }
}

/// Run one scenario and print its row as JSON on stdout
fn cmd_run(path: &Path, config: &BatchConfig) -> Result<(), String> {
    let entry = CatalogEntry::load(path).map_err(|e| e.to_string())?;
    let run = run_scenario(&entry, config).map_err(|e| e.to_string())?;

    tracing::info!(
        scenario = %run.name,
        steps = run.steps,
        has_game_ended = run.has_game_ended,
        recording = ?run.recording_file,
        "Run finished"
    );

    match run.row {
        Some(row) => {
            let json = serde_json::to_string_pretty(&row).map_err(|e| e.to_string())?;
            println!("{json}");
        }
        None => eprintln!("Game has not ended, no feature row produced"),
    }
    Ok(())
}

/// Validate every definition in a directory
fn cmd_validate(dir: &Path) -> Result<(), String> {
    let catalog = ScenarioCatalog::load_from_directory(dir).map_err(|e| e.to_string())?;
    let issues = catalog.validate();

    eprintln!("Checked {} scenarios in {}", catalog.len(), dir.display());
    if issues.is_empty() {
        eprintln!("All scenarios valid");
        return Ok(());
    }
    for issue in &issues {
        eprintln!("  {}: {}", issue.scenario, issue.message);
    }
    Err(format!("{} problems found", issues.len()))
}

/// Print an overview of the accumulated dataset
async fn cmd_dataset(url: String, csv: Option<PathBuf>) -> Result<(), String> {
    let data = match csv {
        Some(path) => CsvFileAggregator::new(path).fetch_data().await,
        None => {
            let aggregator = HttpAggregator::new(url).map_err(|e| e.to_string())?;
            aggregator.fetch_data().await
        }
    }
    .map_err(|e| e.to_string())?;

    let summary = data.summary();
    eprintln!("Rows:    {}", summary.rows);
    eprintln!("Columns: {}", summary.columns);
    if summary.rows > 0 {
        let rate = |n: usize| n as f64 / summary.rows as f64 * 100.0;
        eprintln!(
            "Side A favourable: {} ({:.1}%)",
            summary.side_a_favourable,
            rate(summary.side_a_favourable)
        );
        eprintln!(
            "Side B favourable: {} ({:.1}%)",
            summary.side_b_favourable,
            rate(summary.side_b_favourable)
        );
    }
    Ok(())
}
