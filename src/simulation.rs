// EUVSim - Simulation driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end run: catalog, schedule, parallel chunks, merge, report.
//!
//! ```rust,no_run
//! use euvsim::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::laser_default().with_duration(60.0).with_seed(7);
//! let summary = Simulation::new(config)?.run("out")?;
//! println!("{} rows", summary.total_rows);
//! # Ok::<(), euvsim::SimError>(())
//! ```

use crate::catalog::generate_catalog;
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::event::DegradationEvent;
use crate::executor::{execute_chunks, ChunkContext};
use crate::logs::PhraseBook;
use crate::merge::{dedup_events, merge_chunks};
use crate::partition::partition;
use crate::report::{FailedChunk, OutputManifest, RunManifest, SimulationReport};
use crate::schedule::{schedule_events, Schedule};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// File name of the configuration copy saved next to the outputs.
pub const CONFIG_FILE_NAME: &str = "myconfig.json";

/// Paths of the final outputs of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    /// `{module}_logs.csv`
    pub dataset: PathBuf,
    /// `{module}_events.log`
    pub log: PathBuf,
    /// `{module}_result.txt`
    pub report: PathBuf,
    /// `{module}_manifest.json`
    pub manifest: PathBuf,
}

impl OutputPaths {
    /// Output paths for `module` (already file-name safe) under `dir`.
    pub fn new(dir: impl AsRef<Path>, module: &str) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            dataset: dir.join(format!("{}_logs.csv", module)),
            log: dir.join(format!("{}_events.log", module)),
            report: dir.join(format!("{}_result.txt", module)),
            manifest: dir.join(format!("{}_manifest.json", module)),
            dir,
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Rows from successful chunks.
    pub total_rows: usize,
    /// Log lines from successful chunks.
    pub total_logs: usize,
    /// Scheduled events and per-spec placement statistics.
    pub schedule: Schedule,
    /// Deduplicated applied events.
    pub applied_events: Vec<DegradationEvent>,
    /// Chunks that produced no output.
    pub failed_chunks: Vec<FailedChunk>,
    pub outputs: OutputPaths,
    /// Wall-clock time of the run in seconds.
    pub elapsed_secs: f64,
}

impl RunSummary {
    /// True when every chunk succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty()
    }
}

/// A configured simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    phrases: PhraseBook,
    config_section: Option<String>,
}

impl Simulation {
    /// Validate `config` and prepare a run.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            phrases: PhraseBook::default(),
            config_section: None,
        })
    }

    /// Use a custom phrase book for log lines.
    pub fn with_phrases(mut self, phrases: PhraseBook) -> Self {
        self.phrases = phrases;
        self
    }

    /// Save the effective configuration as `myconfig.json` in the output
    /// directory, wrapped under `section`.
    pub fn with_saved_config(mut self, section: &str) -> Self {
        self.config_section = Some(section.to_string());
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Fill an empty catalog from the catalog settings, seeded with the run
    /// seed. Does nothing when parameters are already listed.
    pub fn materialize_catalog(&mut self) -> Result<()> {
        if !self.config.parameters.is_empty() {
            return Ok(());
        }
        let Some(spec) = &self.config.catalog else {
            return Err(SimError::config(
                "no parameters configured and no catalog settings to generate them",
            ));
        };
        let mut rng = StdRng::seed_from_u64(self.config.base_seed());
        let catalog = generate_catalog(spec, self.config.decimal_places, &mut rng)?;
        info!(parameters = catalog.len(), "catalog generated");
        self.config.parameters = catalog;
        Ok(())
    }

    /// Run the simulation, writing all outputs under `output_dir`.
    ///
    /// Chunk failures do not abort the run; they are listed in the summary
    /// and the manifest.
    pub fn run(&mut self, output_dir: impl AsRef<Path>) -> Result<RunSummary> {
        let started = Instant::now();
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .map_err(|e| SimError::persistence(output_dir, e))?;

        self.materialize_catalog()?;
        let config = &self.config;
        let outputs = OutputPaths::new(output_dir, &config.module_name_safe());
        info!(
            module = %config.module_name,
            parameters = config.parameters.len(),
            duration = config.duration,
            sampling_rate = config.sampling_rate,
            chunks = config.num_threads,
            "simulation started"
        );

        let config_file = match &self.config_section {
            Some(section) => {
                let path = output_dir.join(CONFIG_FILE_NAME);
                config.to_json_file(&path, Some(section))?;
                Some(CONFIG_FILE_NAME.to_string())
            }
            None => None,
        };

        let mut rng = StdRng::seed_from_u64(config.base_seed());
        let schedule = schedule_events(
            &config.degradation_parameters,
            config.start_time,
            config.duration,
            &mut rng,
        );

        let chunks = partition(
            &schedule.events,
            config.start_time,
            config.duration,
            config.num_threads,
            config.base_seed(),
        );
        let ctx = ChunkContext {
            catalog: &config.parameters,
            sampling_rate: config.sampling_rate,
            decimal_places: config.decimal_places,
            phrases: &self.phrases,
            output_dir,
        };
        let execution = execute_chunks(chunks, &ctx, config.num_threads);

        let failed_chunks: Vec<FailedChunk> = execution
            .failed()
            .map(|r| FailedChunk {
                index: r.index,
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();
        if !failed_chunks.is_empty() {
            warn!(failed = failed_chunks.len(), "some chunks produced no output");
        }

        merge_chunks(
            &execution.reports,
            &config.parameters.names(),
            output_dir,
            &outputs.dataset,
            &outputs.log,
        )?;

        let applied_events = dedup_events(&execution.applied_events);
        SimulationReport {
            parameters: config.parameters.names(),
            events: applied_events.clone(),
            total_rows: execution.total_rows,
            total_logs: execution.total_logs,
        }
        .write(&outputs.report)?;

        let elapsed_secs = started.elapsed().as_secs_f64();
        let mut manifest = RunManifest::new(&config.module_name, config.base_seed())
            .with_timing(
                config.start_time,
                config.duration,
                config.sampling_rate,
                config.num_threads,
            )
            .with_totals(
                execution.total_rows,
                execution.total_logs,
                applied_events.len(),
            )
            .with_schedule(schedule.events.clone(), schedule.outcomes.clone())
            .with_outputs(OutputManifest {
                dataset: file_name(&outputs.dataset),
                log: file_name(&outputs.log),
                report: file_name(&outputs.report),
                config: config_file,
            })
            .with_elapsed(elapsed_secs);
        for failed in &failed_chunks {
            manifest = manifest.add_failed_chunk(failed.index, &failed.error);
        }
        manifest.to_json_file(&outputs.manifest)?;

        info!(
            rows = execution.total_rows,
            logs = execution.total_logs,
            applied_events = applied_events.len(),
            failed_chunks = failed_chunks.len(),
            elapsed_secs,
            "simulation finished"
        );

        Ok(RunSummary {
            total_rows: execution.total_rows,
            total_logs: execution.total_logs,
            schedule,
            applied_events,
            failed_chunks,
            outputs,
            elapsed_secs,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
