// EUVSim - Merge and deduplication
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Combining chunk outputs into the final dataset and log.
//!
//! Dataset rows are sorted by timestamp; log lines keep chunk order.
//! Chunk files are removed once merged.

use crate::dataset::TIMESTAMP_COLUMN;
use crate::error::{Result, SimError};
use crate::event::{DegradationEvent, EventKey};
use crate::executor::{chunk_data_file, chunk_log_file, ChunkReport};
use crate::timeline::parse_timestamp;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Merge chunk datasets into `out`, sorted by timestamp.
///
/// Files are streamed in the given order while their timestamps never
/// decrease; otherwise every row is read and stably sorted. Field text is
/// copied verbatim. Returns the number of rows written.
pub fn merge_datasets(files: &[PathBuf], header: &[String], out: &Path) -> Result<usize> {
    let mut expected = Vec::with_capacity(header.len() + 1);
    expected.push(TIMESTAMP_COLUMN.to_string());
    expected.extend(header.iter().cloned());

    let mut writer = csv::Writer::from_path(out)?;
    writer.write_record(&expected)?;

    let mut last: Option<DateTime<Utc>> = None;
    let mut rows = 0;
    for file in files {
        let mut reader = open_chunk(file, &expected)?;
        for record in reader.records() {
            let record = record?;
            let ts = record_timestamp(file, &record)?;
            if last.is_some_and(|prev| ts < prev) {
                drop(writer);
                debug!(file = %file.display(), "chunk datasets out of order, sorting");
                return merge_buffered(files, &expected, out);
            }
            last = Some(ts);
            writer.write_record(&record)?;
            rows += 1;
        }
        debug!(file = %file.display(), rows, "chunk dataset streamed");
    }

    writer.flush().map_err(|e| SimError::persistence(out, e))?;
    Ok(rows)
}

fn open_chunk(file: &Path, expected: &[String]) -> Result<csv::Reader<File>> {
    let mut reader = csv::Reader::from_path(file)?;
    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if found != expected {
        return Err(SimError::config(format!(
            "{} has unexpected columns",
            file.display()
        )));
    }
    Ok(reader)
}

fn record_timestamp(file: &Path, record: &csv::StringRecord) -> Result<DateTime<Utc>> {
    let raw = record.get(0).unwrap_or_default();
    parse_timestamp(raw).ok_or_else(|| {
        SimError::Timestamp(format!("{}: invalid timestamp '{}'", file.display(), raw))
    })
}

fn merge_buffered(files: &[PathBuf], expected: &[String], out: &Path) -> Result<usize> {
    let mut rows: Vec<(DateTime<Utc>, csv::StringRecord)> = Vec::new();
    for file in files {
        let mut reader = open_chunk(file, expected)?;
        for record in reader.records() {
            let record = record?;
            rows.push((record_timestamp(file, &record)?, record));
        }
    }

    rows.sort_by_key(|(ts, _)| *ts);

    let mut writer = csv::Writer::from_path(out)?;
    writer.write_record(expected)?;
    for (_, record) in &rows {
        writer.write_record(record)?;
    }
    writer.flush().map_err(|e| SimError::persistence(out, e))?;
    Ok(rows.len())
}

/// Concatenate log files into `out` in the given order. Returns the number
/// of lines written.
pub fn concat_logs(files: &[PathBuf], out: &Path) -> Result<usize> {
    let target = File::create(out).map_err(|e| SimError::persistence(out, e))?;
    let mut writer = BufWriter::new(target);
    let mut lines = 0;

    for file in files {
        let source = File::open(file).map_err(|e| SimError::persistence(file, e))?;
        for line in BufReader::new(source).lines() {
            let line = line.map_err(|e| SimError::persistence(file, e))?;
            writeln!(writer, "{}", line).map_err(|e| SimError::persistence(out, e))?;
            lines += 1;
        }
    }

    writer.flush().map_err(|e| SimError::persistence(out, e))?;
    Ok(lines)
}

/// Delete the data and log files of every chunk in `reports`, including
/// partial output of failed chunks. Directories are left alone.
pub fn remove_chunk_files(reports: &[ChunkReport], output_dir: &Path) -> Result<()> {
    for report in reports {
        for name in [chunk_data_file(report.index), chunk_log_file(report.index)] {
            let path = output_dir.join(name);
            if path.is_dir() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(SimError::persistence(path, e)),
            }
        }
    }
    Ok(())
}

/// Final merged outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedOutput {
    pub data_file: PathBuf,
    pub log_file: PathBuf,
    pub rows: usize,
    pub log_lines: usize,
}

/// Merge the files of successful chunks, in chunk order, then remove all
/// chunk files.
pub fn merge_chunks(
    reports: &[ChunkReport],
    header: &[String],
    output_dir: &Path,
    data_out: &Path,
    log_out: &Path,
) -> Result<MergedOutput> {
    let mut ordered: Vec<&ChunkReport> = reports.iter().filter(|r| r.is_ok()).collect();
    ordered.sort_by_key(|r| r.index);

    let data_files: Vec<PathBuf> = ordered.iter().filter_map(|r| r.data_file.clone()).collect();
    let log_files: Vec<PathBuf> = ordered.iter().filter_map(|r| r.log_file.clone()).collect();

    let rows = merge_datasets(&data_files, header, data_out)?;
    let log_lines = concat_logs(&log_files, log_out)?;
    remove_chunk_files(reports, output_dir)?;

    info!(
        rows,
        log_lines,
        chunks = ordered.len(),
        data = %data_out.display(),
        "chunk outputs merged"
    );
    Ok(MergedOutput {
        data_file: data_out.to_path_buf(),
        log_file: log_out.to_path_buf(),
        rows,
        log_lines,
    })
}

/// Drop exact duplicates, keeping the first occurrence.
///
/// Pieces of one event split across chunks differ in start/end and are
/// all kept.
pub fn dedup_events(events: &[DegradationEvent]) -> Vec<DegradationEvent> {
    let mut seen: HashSet<EventKey> = HashSet::new();
    events
        .iter()
        .filter(|e| seen.insert(e.key()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveKind;
    use crate::timeline::secs;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn t(s: f64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 21, 0, 0, 0).unwrap() + secs(s)
    }

    fn header() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    fn ok_report(dir: &Path, index: usize, data: &str, log: &str) -> ChunkReport {
        let data_file = dir.join(chunk_data_file(index));
        let log_file = dir.join(chunk_log_file(index));
        fs::write(&data_file, data).unwrap();
        fs::write(&log_file, log).unwrap();
        ChunkReport {
            index,
            rows: data.lines().count() - 1,
            logs: log.lines().count(),
            applied_events: Vec::new(),
            data_file: Some(data_file),
            log_file: Some(log_file),
            error: None,
        }
    }

    #[test]
    fn test_merge_sorts_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let reports = vec![
            ok_report(
                dir.path(),
                1,
                "Timestamp,a,b\n2025-01-21T00:00:02Z,3,\n2025-01-21T00:00:03Z,4,4.5\n",
                "late one\nlate two\n",
            ),
            ok_report(
                dir.path(),
                0,
                "Timestamp,a,b\n2025-01-21T00:00:00Z,1,1.5\n2025-01-21T00:00:01Z,2,2.5\n",
                "early\n",
            ),
        ];
        let data_out = dir.path().join("m_logs.csv");
        let log_out = dir.path().join("m_events.log");
        let merged = merge_chunks(&reports, &header(), dir.path(), &data_out, &log_out).unwrap();

        assert_eq!(merged.rows, 4);
        assert_eq!(merged.log_lines, 3);
        let data = fs::read_to_string(&data_out).unwrap();
        assert_eq!(
            data,
            "Timestamp,a,b\n\
             2025-01-21T00:00:00Z,1,1.5\n\
             2025-01-21T00:00:01Z,2,2.5\n\
             2025-01-21T00:00:02Z,3,\n\
             2025-01-21T00:00:03Z,4,4.5\n"
        );
        let log = fs::read_to_string(&log_out).unwrap();
        assert_eq!(log, "early\nlate one\nlate two\n");
        assert!(!dir.path().join(chunk_data_file(0)).exists());
        assert!(!dir.path().join(chunk_log_file(1)).exists());
    }

    #[test]
    fn test_merge_skips_failed_chunks() {
        let dir = TempDir::new().unwrap();
        let mut failed = ok_report(
            dir.path(),
            1,
            "Timestamp,a,b\n2025-01-21T00:00:09Z,9,9\n",
            "partial\n",
        );
        failed.error = Some("disk full".to_string());
        let reports = vec![
            ok_report(dir.path(), 0, "Timestamp,a,b\n2025-01-21T00:00:00Z,1,1\n", "ok\n"),
            failed,
        ];
        let data_out = dir.path().join("out.csv");
        let log_out = dir.path().join("out.log");
        let merged = merge_chunks(&reports, &header(), dir.path(), &data_out, &log_out).unwrap();
        assert_eq!(merged.rows, 1);
        assert_eq!(merged.log_lines, 1);
        assert!(!dir.path().join(chunk_data_file(1)).exists());
    }

    #[test]
    fn test_merge_out_of_order_files_sorted() {
        let dir = TempDir::new().unwrap();
        let late = dir.path().join("late.csv");
        let early = dir.path().join("early.csv");
        fs::write(
            &late,
            "Timestamp,a,b\n2025-01-21T00:00:02Z,3,3\n2025-01-21T00:00:03Z,4,4\n",
        )
        .unwrap();
        fs::write(
            &early,
            "Timestamp,a,b\n2025-01-21T00:00:00Z,1,1\n2025-01-21T00:00:02Z,2,2\n",
        )
        .unwrap();

        let out = dir.path().join("out.csv");
        let rows = merge_datasets(&[late, early], &header(), &out).unwrap();
        assert_eq!(rows, 4);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "Timestamp,a,b\n\
             2025-01-21T00:00:00Z,1,1\n\
             2025-01-21T00:00:02Z,3,3\n\
             2025-01-21T00:00:02Z,2,2\n\
             2025-01-21T00:00:03Z,4,4\n"
        );
    }

    #[test]
    fn test_merge_without_chunks_writes_header() {
        let dir = TempDir::new().unwrap();
        let data_out = dir.path().join("out.csv");
        let rows = merge_datasets(&[], &header(), &data_out).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(fs::read_to_string(&data_out).unwrap(), "Timestamp,a,b\n");
    }

    #[test]
    fn test_merge_rejects_foreign_columns() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.csv");
        fs::write(&file, "Timestamp,z\n2025-01-21T00:00:00Z,1\n").unwrap();
        let err = merge_datasets(&[file], &header(), &dir.path().join("o.csv")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_log_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let err = concat_logs(&[dir.path().join("gone.log")], &dir.path().join("o.log")).unwrap_err();
        assert!(matches!(err, SimError::Persistence { .. }));
    }

    #[test]
    fn test_dedup_events() {
        let a = DegradationEvent::new("p", t(0.0), t(10.0), 0.1, CurveKind::Step);
        let piece = DegradationEvent::new("p", t(10.0), t(20.0), 0.1, CurveKind::Step);
        let other = DegradationEvent::new("q", t(0.0), t(10.0), 0.1, CurveKind::Step);
        let events = vec![a.clone(), piece.clone(), a.clone(), other.clone(), piece.clone()];
        assert_eq!(dedup_events(&events), vec![a, piece, other]);
    }
}
