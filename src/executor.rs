// EUVSim - Chunk executor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-chunk pipeline and the worker pool that runs it.
//!
//! Each chunk goes through timestamps, noise, degradation, clamping and
//! log rendering, then lands as `data_chunk_{i}.csv` and `logs_chunk_{i}.log`
//! in the output directory. Chunks share nothing mutable: a worker only
//! reads the catalog and phrase book and owns its frame and generator.
//!
//! A chunk that fails, by error or by panic, yields a [`ChunkReport`] with
//! `error` set; the other chunks are unaffected.

use crate::catalog::Catalog;
use crate::clamp::clamp_frame;
use crate::degrade::apply_degradations;
use crate::error::{Result, SimError};
use crate::event::DegradationEvent;
use crate::logs::{render_logs, PhraseBook};
use crate::partition::Chunk;
use crate::sampler::sample_noise_with;
use crate::timeline::generate_timestamps;
use crossbeam::channel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::any::Any;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

/// Name of the dataset file of chunk `index`.
pub fn chunk_data_file(index: usize) -> String {
    format!("data_chunk_{}.csv", index)
}

/// Name of the log file of chunk `index`.
pub fn chunk_log_file(index: usize) -> String {
    format!("logs_chunk_{}.log", index)
}

/// Read-only inputs shared by every chunk.
#[derive(Debug, Clone, Copy)]
pub struct ChunkContext<'a> {
    pub catalog: &'a Catalog,
    pub sampling_rate: f64,
    pub decimal_places: u32,
    pub phrases: &'a PhraseBook,
    pub output_dir: &'a Path,
}

/// Outcome of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkReport {
    pub index: usize,
    /// Samples written.
    pub rows: usize,
    /// Log lines written.
    pub logs: usize,
    /// Clipped events that touched at least one sample.
    pub applied_events: Vec<DegradationEvent>,
    pub data_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    /// Failure description; `None` on success.
    pub error: Option<String>,
}

impl ChunkReport {
    /// Report for a chunk that produced nothing.
    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            rows: 0,
            logs: 0,
            applied_events: Vec::new(),
            data_file: None,
            log_file: None,
            error: Some(error.into()),
        }
    }

    /// Check if the chunk succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run the full pipeline for one chunk and persist its files.
pub fn run_chunk(chunk: &Chunk, ctx: &ChunkContext<'_>) -> Result<ChunkReport> {
    let timestamps = generate_timestamps(chunk.start, chunk.duration_secs, ctx.sampling_rate);
    let mut rng = StdRng::seed_from_u64(chunk.seed);

    let mut frame = sample_noise_with(timestamps, ctx.catalog, ctx.decimal_places, &mut rng)?;
    let applied_events = apply_degradations(&mut frame, ctx.catalog, &chunk.events);
    let clamped = clamp_frame(&mut frame, ctx.catalog, &chunk.events, ctx.decimal_places);
    let lines = render_logs(&frame, ctx.catalog, ctx.phrases, &mut rng);
    debug!(
        chunk = chunk.index,
        rows = frame.len(),
        applied = applied_events.len(),
        clamped,
        "chunk generated"
    );

    let data_file = ctx.output_dir.join(chunk_data_file(chunk.index));
    frame.write_csv(&data_file)?;
    let log_file = ctx.output_dir.join(chunk_log_file(chunk.index));
    write_lines(&log_file, &lines)?;

    Ok(ChunkReport {
        index: chunk.index,
        rows: frame.len(),
        logs: lines.len(),
        applied_events,
        data_file: Some(data_file),
        log_file: Some(log_file),
        error: None,
    })
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let file = File::create(path).map_err(|e| SimError::persistence(path, e))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| SimError::persistence(path, e))?;
    }
    writer.flush().map_err(|e| SimError::persistence(path, e))
}

/// Run `task` on one chunk, turning errors and panics into a failed report.
pub fn execute_chunk<F>(chunk: &Chunk, task: &F) -> ChunkReport
where
    F: Fn(&Chunk) -> Result<ChunkReport>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| task(chunk))) {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => ChunkReport::failed(chunk.index, e.to_string()),
        Err(payload) => {
            let err = SimError::ChunkPanic {
                index: chunk.index,
                message: panic_message(payload.as_ref()),
            };
            ChunkReport::failed(chunk.index, err.to_string())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `task` over `chunks` on a pool of `workers` threads.
///
/// Blocks until every chunk has been processed. Reports are returned in
/// chunk-index order whatever the completion order.
pub fn run_pool<F>(chunks: Vec<Chunk>, workers: usize, task: F) -> Vec<ChunkReport>
where
    F: Fn(&Chunk) -> Result<ChunkReport> + Sync,
{
    let total = chunks.len();
    let workers = workers.max(1).min(total.max(1));
    let (job_tx, job_rx) = channel::unbounded::<Chunk>();
    let (result_tx, result_rx) = channel::unbounded::<ChunkReport>();

    for chunk in chunks {
        if job_tx.send(chunk).is_err() {
            break;
        }
    }
    drop(job_tx);

    let mut reports = Vec::with_capacity(total);
    thread::scope(|s| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let task = &task;
            s.spawn(move || {
                for chunk in job_rx.iter() {
                    if result_tx.send(execute_chunk(&chunk, task)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        for report in result_rx.iter() {
            match &report.error {
                None => info!(
                    chunk = report.index,
                    rows = report.rows,
                    completed = reports.len() + 1,
                    total,
                    "chunk finished"
                ),
                Some(error) => warn!(
                    chunk = report.index,
                    completed = reports.len() + 1,
                    total,
                    %error,
                    "chunk failed"
                ),
            }
            reports.push(report);
        }
    });

    reports.sort_by_key(|r| r.index);
    reports
}

/// Run every chunk through the standard pipeline.
pub fn execute_chunks(chunks: Vec<Chunk>, ctx: &ChunkContext<'_>, workers: usize) -> Execution {
    Execution::from_reports(run_pool(chunks, workers, |chunk| run_chunk(chunk, ctx)))
}

/// Aggregated outcome of all chunks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    /// One report per chunk, in index order.
    pub reports: Vec<ChunkReport>,
    /// Rows from successful chunks.
    pub total_rows: usize,
    /// Log lines from successful chunks.
    pub total_logs: usize,
    /// Applied events from successful chunks, in chunk order.
    pub applied_events: Vec<DegradationEvent>,
}

impl Execution {
    /// Aggregate reports; failed chunks contribute nothing.
    pub fn from_reports(reports: Vec<ChunkReport>) -> Self {
        let mut execution = Self::default();
        for report in reports.iter().filter(|r| r.is_ok()) {
            execution.total_rows += report.rows;
            execution.total_logs += report.logs;
            execution
                .applied_events
                .extend(report.applied_events.iter().cloned());
        }
        execution.reports = reports;
        execution
    }

    /// Reports of successful chunks.
    pub fn succeeded(&self) -> impl Iterator<Item = &ChunkReport> {
        self.reports.iter().filter(|r| r.is_ok())
    }

    /// Reports of failed chunks.
    pub fn failed(&self) -> impl Iterator<Item = &ChunkReport> {
        self.reports.iter().filter(|r| !r.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Parameter;
    use crate::curve::CurveKind;
    use crate::dataset::SampleFrame;
    use crate::partition::partition;
    use crate::timeline::secs;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn t(s: f64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 21, 0, 0, 0).unwrap() + secs(s)
    }

    fn catalog() -> Catalog {
        Catalog::new()
            .with(Parameter::new("Main_Laser_Power", 1000.0, 0.01).with_unit("W"))
            .unwrap()
            .with(Parameter::new("Chamber_Pressure", 20.0, 0.02))
            .unwrap()
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        let events = [DegradationEvent::new(
            "Main_Laser_Power",
            t(10.0),
            t(30.0),
            0.2,
            CurveKind::Linear,
        )];
        partition(&events, t(0.0), 40.0, n, 0)
    }

    #[test]
    fn test_run_chunk_writes_files() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog();
        let phrases = PhraseBook::default();
        let ctx = ChunkContext {
            catalog: &catalog,
            sampling_rate: 2.0,
            decimal_places: 3,
            phrases: &phrases,
            output_dir: dir.path(),
        };
        let chunk = &chunks(2)[0];
        let report = run_chunk(chunk, &ctx).unwrap();

        assert_eq!(report.rows, 40);
        assert_eq!(report.logs, 80);
        assert_eq!(report.applied_events.len(), 1);
        assert_eq!(report.applied_events[0].end, t(20.0));

        let frame = SampleFrame::from_csv(report.data_file.unwrap()).unwrap();
        assert_eq!(frame.len(), 40);
        let log = std::fs::read_to_string(report.log_file.unwrap()).unwrap();
        assert_eq!(log.lines().count(), 80);
        assert!(log.contains("WARNING: "));
    }

    #[test]
    fn test_same_seed_same_files() {
        let catalog = catalog();
        let phrases = PhraseBook::default();
        let read = |dir: &TempDir| {
            let ctx = ChunkContext {
                catalog: &catalog,
                sampling_rate: 5.0,
                decimal_places: 6,
                phrases: &phrases,
                output_dir: dir.path(),
            };
            let report = run_chunk(&chunks(1)[0], &ctx).unwrap();
            (
                std::fs::read_to_string(report.data_file.unwrap()).unwrap(),
                std::fs::read_to_string(report.log_file.unwrap()).unwrap(),
            )
        };
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        assert_eq!(read(&a), read(&b));
    }

    #[test]
    fn test_pool_isolates_failures() {
        let reports = run_pool(chunks(6), 3, |chunk| {
            match chunk.index {
                2 => panic!("sensor bus fault"),
                4 => Err(SimError::config("bad chunk")),
                i => Ok(ChunkReport {
                    index: i,
                    rows: 10,
                    logs: 20,
                    applied_events: chunk.events.clone(),
                    data_file: None,
                    log_file: None,
                    error: None,
                }),
            }
        });

        assert_eq!(reports.len(), 6);
        let indices: Vec<usize> = reports.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        assert!(reports[2].error.as_ref().unwrap().contains("sensor bus fault"));
        assert!(reports[4].error.as_ref().unwrap().contains("bad chunk"));

        let execution = Execution::from_reports(reports);
        assert_eq!(execution.total_rows, 40);
        assert_eq!(execution.total_logs, 80);
        assert_eq!(execution.failed().count(), 2);
        assert_eq!(execution.succeeded().count(), 4);
    }

    #[test]
    fn test_execute_chunks_missing_output_dir() {
        let catalog = catalog();
        let phrases = PhraseBook::empty();
        let missing = std::env::temp_dir().join("euvsim-no-such-dir").join("nested");
        let ctx = ChunkContext {
            catalog: &catalog,
            sampling_rate: 1.0,
            decimal_places: 2,
            phrases: &phrases,
            output_dir: &missing,
        };
        let execution = execute_chunks(chunks(2), &ctx, 2);
        assert_eq!(execution.failed().count(), 2);
        assert_eq!(execution.total_rows, 0);
        assert!(execution.applied_events.is_empty());
    }

    #[test]
    fn test_more_workers_than_chunks() {
        let reports = run_pool(chunks(2), 16, |chunk| Ok(ChunkReport::failed(chunk.index, "x")));
        assert_eq!(reports.len(), 2);
    }
}
