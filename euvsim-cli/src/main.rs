// EUVSim CLI - Command-line runner
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # EUVSim CLI
//!
//! Runs the EUV telemetry simulator from a JSON configuration.
//!
//! ## Usage
//!
//! ```bash
//! # Stock laser subsystem run; the generated config is saved as myconfig.json
//! euvsim run --output-dir out
//!
//! # Run a saved configuration with a fixed seed and export metrics
//! euvsim run --config out/myconfig.json --seed 42 --metrics-out out/metrics.prom
//!
//! # Write a default configuration with 200 parameters
//! euvsim init-config --out laser.json --parameters 200
//! ```

mod metrics;

use clap::{Args, Parser, Subcommand};
use euvsim::{SimError, Simulation, SimulationConfig, LASER_SECTION};
use metrics::{encode_metrics, record_run};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Exit code when some chunks failed but outputs were written.
const EXIT_PARTIAL: u8 = 2;

/// EUV machine telemetry simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset, event log and report
    Run(RunArgs),
    /// Write the default laser subsystem configuration
    InitConfig(InitArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Configuration file; the stock laser run is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Section of the configuration file to use
    #[arg(long)]
    section: Option<String>,

    /// Directory receiving all outputs
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Worker and chunk count
    #[arg(short, long)]
    threads: Option<usize>,

    /// Run seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run duration in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Write Prometheus metrics to this file after the run
    #[arg(long)]
    metrics_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Output file
    #[arg(short, long)]
    out: PathBuf,

    /// Number of generated parameters
    #[arg(short, long)]
    parameters: Option<usize>,

    /// Catalog seed
    #[arg(short, long)]
    seed: Option<u64>,
}

/// Errors surfaced by the command-line runner.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Simulation(#[from] SimError),

    #[error("Metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match cli.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("EUVSim v{}", euvsim::VERSION);

    let result = match cli.command {
        Command::Run(args) => run(&args),
        Command::InitConfig(args) => init_config(&args).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_PARTIAL),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build the configuration for `run` from a file or the stock laser run,
/// then apply command-line overrides.
fn load_config(args: &RunArgs) -> Result<SimulationConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path, args.section.as_deref())?,
        None => SimulationConfig::laser_default(),
    };
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(duration) = args.duration {
        config = config.with_duration(duration);
    }
    Ok(config)
}

/// Returns `Ok(false)` when some chunks failed.
fn run(args: &RunArgs) -> Result<bool, CliError> {
    let config = load_config(args)?;
    let mut simulation = Simulation::new(config)?;
    if args.config.is_none() {
        simulation = simulation.with_saved_config(LASER_SECTION);
    }

    let summary = simulation.run(&args.output_dir)?;
    info!(
        rows = summary.total_rows,
        logs = summary.total_logs,
        dataset = %summary.outputs.dataset.display(),
        "outputs written"
    );
    for outcome in summary.schedule.outcomes.iter().filter(|o| o.skipped() > 0) {
        warn!(
            parameter = %outcome.parameter,
            requested = outcome.requested,
            placed = outcome.placed,
            "overlapping degradation placements were skipped"
        );
    }

    if let Some(path) = &args.metrics_out {
        record_run(&summary);
        write_file(path, &encode_metrics()?)?;
        info!(path = %path.display(), "metrics written");
    }

    Ok(summary.is_complete())
}

fn init_config(args: &InitArgs) -> Result<(), CliError> {
    let mut config = SimulationConfig::laser_default();
    if let Some(n) = args.parameters {
        if let Some(spec) = config.catalog.as_mut() {
            spec.num_parameters = n;
        }
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let mut simulation = Simulation::new(config)?;
    simulation.materialize_catalog()?;
    simulation
        .config()
        .to_json_file(&args.out, Some(LASER_SECTION))?;
    info!(
        path = %args.out.display(),
        parameters = simulation.config().parameters.len(),
        "configuration written"
    );
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "euvsim",
            "run",
            "--config",
            "laser.json",
            "--threads",
            "4",
            "--seed",
            "9",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.config, Some(PathBuf::from("laser.json")));
                assert_eq!(args.threads, Some(4));
                assert_eq!(args.seed, Some(9));
                assert_eq!(args.output_dir, PathBuf::from("."));
            }
            Command::InitConfig(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_init_config_requires_out() {
        assert!(Cli::try_parse_from(["euvsim", "init-config"]).is_err());
        assert!(Cli::try_parse_from(["euvsim", "init-config", "--out", "c.json"]).is_ok());
    }

    #[test]
    fn test_init_then_run() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("laser.json");
        init_config(&InitArgs {
            out: config_path.clone(),
            parameters: Some(12),
            seed: Some(5),
        })
        .unwrap();

        let loaded = SimulationConfig::from_json_file(&config_path, None).unwrap();
        assert_eq!(loaded.parameters.len(), 12);
        assert!(loaded.parameters.contains("Main_Laser_Power"));

        let out = dir.path().join("out");
        let metrics_path = dir.path().join("metrics.prom");
        let complete = run(&RunArgs {
            config: Some(config_path),
            section: None,
            output_dir: out.clone(),
            threads: Some(2),
            seed: None,
            duration: Some(4.0),
            metrics_out: Some(metrics_path.clone()),
        })
        .unwrap();

        assert!(complete);
        assert!(out.join("Laser_Subsystem.simple.5_logs.csv").exists());
        assert!(out.join("Laser_Subsystem.simple.5_result.txt").exists());
        assert!(!out.join(euvsim::CONFIG_FILE_NAME).exists());
        let metrics = std::fs::read_to_string(metrics_path).unwrap();
        assert!(metrics.contains("euvsim_rows_total"));
    }

    #[test]
    fn test_run_missing_config_fails() {
        let dir = TempDir::new().unwrap();
        let err = run(&RunArgs {
            config: Some(dir.path().join("absent.json")),
            section: None,
            output_dir: dir.path().to_path_buf(),
            threads: None,
            seed: None,
            duration: None,
            metrics_out: None,
        })
        .unwrap_err();
        assert!(matches!(err, CliError::Simulation(SimError::Persistence { .. })));
    }
}
