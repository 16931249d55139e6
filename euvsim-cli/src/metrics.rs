// EUVSim CLI - Prometheus run metrics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics describing a finished run.
//!
//! The registry is process-global; values are filled from a
//! [`RunSummary`] and written out in the text exposition format.

use euvsim::RunSummary;
use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_int_counter, register_int_counter_vec, Encoder, Gauge, IntCounter,
    IntCounterVec, TextEncoder,
};

lazy_static! {
    // ============================================================
    // Output volume
    // ============================================================

    /// Dataset rows written by successful chunks.
    pub static ref ROWS_TOTAL: IntCounter = register_int_counter!(
        "euvsim_rows_total",
        "Dataset rows generated"
    ).unwrap();

    /// Log lines written by successful chunks.
    pub static ref LOG_LINES_TOTAL: IntCounter = register_int_counter!(
        "euvsim_log_lines_total",
        "Event log lines generated"
    ).unwrap();

    /// Chunks that produced no output.
    pub static ref CHUNK_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "euvsim_chunk_failures_total",
        "Chunks that failed"
    ).unwrap();

    // ============================================================
    // Degradation events
    // ============================================================

    /// Placement attempts per parameter.
    pub static ref EVENTS_REQUESTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "euvsim_degradation_events_requested_total",
        "Degradation placements requested",
        &["parameter"]
    ).unwrap();

    /// Events placed per parameter.
    pub static ref EVENTS_PLACED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "euvsim_degradation_events_placed_total",
        "Degradation events placed",
        &["parameter"]
    ).unwrap();

    /// Distinct event pieces that touched at least one sample.
    pub static ref APPLIED_EVENTS_TOTAL: IntCounter = register_int_counter!(
        "euvsim_applied_events_total",
        "Degradation event pieces applied to samples"
    ).unwrap();

    // ============================================================
    // Timing
    // ============================================================

    /// Wall-clock duration of the last run.
    pub static ref RUN_DURATION_SECONDS: Gauge = register_gauge!(
        "euvsim_run_duration_seconds",
        "Wall-clock duration of the run in seconds"
    ).unwrap();
}

/// Record the outcome of a run.
pub fn record_run(summary: &RunSummary) {
    ROWS_TOTAL.inc_by(summary.total_rows as u64);
    LOG_LINES_TOTAL.inc_by(summary.total_logs as u64);
    CHUNK_FAILURES_TOTAL.inc_by(summary.failed_chunks.len() as u64);
    APPLIED_EVENTS_TOTAL.inc_by(summary.applied_events.len() as u64);

    for outcome in &summary.schedule.outcomes {
        EVENTS_REQUESTED_TOTAL
            .with_label_values(&[outcome.parameter.as_str()])
            .inc_by(outcome.requested as u64);
        EVENTS_PLACED_TOTAL
            .with_label_values(&[outcome.parameter.as_str()])
            .inc_by(outcome.placed as u64);
    }

    RUN_DURATION_SECONDS.set(summary.elapsed_secs);
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use euvsim::{OutputPaths, Schedule, SpecOutcome};

    fn summary() -> RunSummary {
        RunSummary {
            total_rows: 100,
            total_logs: 250,
            schedule: Schedule {
                events: Vec::new(),
                outcomes: vec![SpecOutcome {
                    parameter: "Metrics_Test_Param".to_string(),
                    requested: 3,
                    placed: 2,
                }],
            },
            applied_events: Vec::new(),
            failed_chunks: Vec::new(),
            outputs: OutputPaths::new("/tmp", "m"),
            elapsed_secs: 1.5,
        }
    }

    #[test]
    fn test_record_run() {
        let rows_before = ROWS_TOTAL.get();
        record_run(&summary());
        assert!(ROWS_TOTAL.get() - rows_before >= 100);
        assert!(
            EVENTS_PLACED_TOTAL
                .with_label_values(&["Metrics_Test_Param"])
                .get()
                >= 2
        );
    }

    #[test]
    fn test_encode_metrics() {
        record_run(&summary());
        let output = encode_metrics().unwrap();
        assert!(output.contains("euvsim_rows_total"));
        assert!(output.contains("euvsim_degradation_events_requested_total{parameter=\"Metrics_Test_Param\"}"));
        assert!(output.contains("euvsim_run_duration_seconds"));
    }
}
