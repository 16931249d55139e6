// EUVSim - Run report and manifest
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Human-readable summary report and machine-readable run manifest.

use crate::error::{Result, SimError};
use crate::event::DegradationEvent;
use crate::schedule::SpecOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Rendering of event times in the text report.
const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Text summary written as `{module}_result.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// Parameter names, catalog order.
    pub parameters: Vec<String>,
    /// Deduplicated applied events.
    pub events: Vec<DegradationEvent>,
    pub total_rows: usize,
    pub total_logs: usize,
}

impl SimulationReport {
    /// Render the report text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("===== Simulation Report =====\n\n");
        out.push_str("List of Generated Parameters:\n");
        for p in &self.parameters {
            let _ = writeln!(out, "- {}", p);
        }
        out.push('\n');

        if self.events.is_empty() {
            out.push_str("No degradation events.\n\n");
        } else {
            out.push_str("All Degradation Events:\n");
            for e in &self.events {
                let _ = writeln!(
                    out,
                    "Parameter: {}, Type: {}, Start: {}, End: {}, dprc: {}",
                    e.parameter,
                    e.curve,
                    e.start.format(REPORT_TIME_FORMAT),
                    e.end.format(REPORT_TIME_FORMAT),
                    e.severity
                );
            }
        }

        let _ = writeln!(out, "\nTotal Number of Data Points: {}", self.total_rows);
        let _ = writeln!(out, "Total Number of Log Entries: {}", self.total_logs);
        out
    }

    /// Write the report text to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.render()).map_err(|e| SimError::persistence(path, e))
    }
}

/// A chunk that produced no output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedChunk {
    pub index: usize,
    pub error: String,
}

/// Names of the files a run leaves behind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputManifest {
    pub dataset: String,
    pub log: String,
    pub report: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

/// Run manifest written as `{module}_manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Module name as configured.
    pub module_name: String,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Run seed.
    pub seed: u64,
    /// First sample time.
    pub start_time: DateTime<Utc>,
    /// Run duration in seconds.
    pub duration_secs: f64,
    /// Samples per second.
    pub sampling_rate: f64,
    /// Number of chunks.
    pub chunks: usize,
    /// Wall-clock run time in seconds.
    pub elapsed_secs: f64,
    pub total_rows: usize,
    pub total_logs: usize,
    /// Events as scheduled, before chunk clipping.
    #[serde(default)]
    pub scheduled_events: Vec<DegradationEvent>,
    /// Requested vs placed per degradation spec.
    #[serde(default)]
    pub placement: Vec<SpecOutcome>,
    /// Number of distinct applied event pieces.
    pub applied_events: usize,
    #[serde(default)]
    pub failed_chunks: Vec<FailedChunk>,
    pub outputs: OutputManifest,
}

impl RunManifest {
    /// Create a manifest stamped with the current time.
    pub fn new(module_name: &str, seed: u64) -> Self {
        Self {
            module_name: module_name.to_string(),
            generated_at: Utc::now(),
            seed,
            start_time: DateTime::<Utc>::default(),
            duration_secs: 0.0,
            sampling_rate: 0.0,
            chunks: 0,
            elapsed_secs: 0.0,
            total_rows: 0,
            total_logs: 0,
            scheduled_events: Vec::new(),
            placement: Vec::new(),
            applied_events: 0,
            failed_chunks: Vec::new(),
            outputs: OutputManifest::default(),
        }
    }

    /// Set timing information.
    pub fn with_timing(
        mut self,
        start_time: DateTime<Utc>,
        duration_secs: f64,
        sampling_rate: f64,
        chunks: usize,
    ) -> Self {
        self.start_time = start_time;
        self.duration_secs = duration_secs;
        self.sampling_rate = sampling_rate;
        self.chunks = chunks;
        self
    }

    /// Set totals.
    pub fn with_totals(mut self, rows: usize, logs: usize, applied_events: usize) -> Self {
        self.total_rows = rows;
        self.total_logs = logs;
        self.applied_events = applied_events;
        self
    }

    /// Set the schedule.
    pub fn with_schedule(mut self, events: Vec<DegradationEvent>, placement: Vec<SpecOutcome>) -> Self {
        self.scheduled_events = events;
        self.placement = placement;
        self
    }

    /// Add a failed chunk.
    pub fn add_failed_chunk(mut self, index: usize, error: &str) -> Self {
        self.failed_chunks.push(FailedChunk {
            index,
            error: error.to_string(),
        });
        self
    }

    /// Set output file names.
    pub fn with_outputs(mut self, outputs: OutputManifest) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set wall-clock duration.
    pub fn with_elapsed(mut self, secs: f64) -> Self {
        self.elapsed_secs = secs;
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save to JSON file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| SimError::persistence(path, e))
    }

    /// Load from JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SimError::persistence(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}
