// EUVSim - Chunk partitioner
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Splitting a run into equal time chunks.
//!
//! Events that straddle a chunk boundary are cut into one piece per chunk
//! they intersect. Each piece carries the clipped window, so curve progress
//! restarts inside every chunk.

use crate::event::DegradationEvent;
use crate::timeline::secs;
use chrono::{DateTime, Utc};

/// One unit of parallel work.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position in the run, from 0.
    pub index: usize,
    /// First timestamp of the chunk.
    pub start: DateTime<Utc>,
    /// Exclusive end; equal to the next chunk's start.
    pub end: DateTime<Utc>,
    /// Nominal chunk length in seconds.
    pub duration_secs: f64,
    /// Seed for this chunk's generator.
    pub seed: u64,
    /// Event pieces clipped to this chunk.
    pub events: Vec<DegradationEvent>,
}

/// Start times of `n` chunks of `chunk_secs` each.
pub fn chunk_starts(run_start: DateTime<Utc>, chunk_secs: f64, n: usize) -> Vec<DateTime<Utc>> {
    (0..n)
        .map(|i| run_start + secs(i as f64 * chunk_secs))
        .collect()
}

/// `[start, end)` windows of `n` chunks tiling `[run_start, run_start + total_secs)`.
///
/// Each end is the next start, and the last end is the run end, so the
/// windows leave no gap after nanosecond rounding.
pub fn chunk_bounds(
    run_start: DateTime<Utc>,
    total_secs: f64,
    n: usize,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let n = n.max(1);
    let starts = chunk_starts(run_start, total_secs / n as f64, n);
    let run_end = run_start + secs(total_secs);
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| (start, starts.get(i + 1).copied().unwrap_or(run_end)))
        .collect()
}

/// Clip every event to every chunk window it intersects.
///
/// Returns one event list per window.
pub fn assign_events(
    events: &[DegradationEvent],
    bounds: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<Vec<DegradationEvent>> {
    bounds
        .iter()
        .map(|&(start, end)| {
            events
                .iter()
                .filter_map(|e| e.clipped(start, end))
                .collect()
        })
        .collect()
}

/// Split `[run_start, run_start + total_secs)` into `n` chunks with their
/// seeds and clipped events.
pub fn partition(
    events: &[DegradationEvent],
    run_start: DateTime<Utc>,
    total_secs: f64,
    n: usize,
    base_seed: u64,
) -> Vec<Chunk> {
    let n = n.max(1);
    let chunk_secs = total_secs / n as f64;
    let bounds = chunk_bounds(run_start, total_secs, n);
    let per_chunk = assign_events(events, &bounds);

    bounds
        .into_iter()
        .zip(per_chunk)
        .enumerate()
        .map(|(index, ((start, end), events))| Chunk {
            index,
            start,
            end,
            duration_secs: chunk_secs,
            seed: base_seed.wrapping_add(index as u64),
            events,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveKind;
    use chrono::TimeZone;

    fn t(s: f64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 21, 0, 0, 0).unwrap() + secs(s)
    }

    fn event(a: f64, b: f64) -> DegradationEvent {
        DegradationEvent::new("Main_Laser_Power", t(a), t(b), 0.2, CurveKind::Linear)
    }

    #[test]
    fn test_chunk_starts() {
        let starts = chunk_starts(t(0.0), 25.0, 4);
        assert_eq!(starts, vec![t(0.0), t(25.0), t(50.0), t(75.0)]);
    }

    #[test]
    fn test_straddling_event_is_split() {
        let chunks = partition(&[event(40.0, 60.0)], t(0.0), 100.0, 2, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].events.len(), 1);
        assert_eq!(chunks[1].events.len(), 1);
        assert_eq!((chunks[0].events[0].start, chunks[0].events[0].end), (t(40.0), t(50.0)));
        assert_eq!((chunks[1].events[0].start, chunks[1].events[0].end), (t(50.0), t(60.0)));
        assert_eq!(chunks[1].events[0].severity, 0.2);
    }

    #[test]
    fn test_pieces_cover_event_exactly() {
        let e = event(13.0, 87.0);
        let chunks = partition(&[e.clone()], t(0.0), 100.0, 7, 0);
        let pieces: Vec<&DegradationEvent> = chunks.iter().flat_map(|c| &c.events).collect();

        let total: f64 = pieces.iter().map(|p| p.duration_secs()).sum();
        assert!((total - e.duration_secs()).abs() < 1e-6);
        for c in &chunks {
            for p in &c.events {
                assert!(p.start >= c.start && p.end <= c.end);
            }
        }
        assert_eq!(pieces.first().unwrap().start, e.start);
        assert_eq!(pieces.last().unwrap().end, e.end);
    }

    #[test]
    fn test_event_on_boundary_not_duplicated() {
        let chunks = partition(&[event(50.0, 60.0)], t(0.0), 100.0, 2, 0);
        assert!(chunks[0].events.is_empty());
        assert_eq!(chunks[1].events.len(), 1);
    }

    #[test]
    fn test_seeds_follow_base() {
        let chunks = partition(&[], t(0.0), 10.0, 3, 100);
        let seeds: Vec<u64> = chunks.iter().map(|c| c.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102]);
        assert_eq!(chunks[2].duration_secs, 10.0 / 3.0);
    }

    #[test]
    fn test_uneven_chunks_tile_run() {
        let chunks = partition(&[], t(0.0), 10.0, 3, 0);
        assert_eq!(chunks[0].start, t(0.0));
        for w in chunks.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
        assert_eq!(chunks[2].end, t(10.0));
    }

    #[test]
    fn test_pieces_meet_on_uneven_boundary() {
        let e = event(1.0, 9.0);
        let chunks = partition(&[e.clone()], t(0.0), 10.0, 3, 0);
        let pieces: Vec<&DegradationEvent> = chunks.iter().flat_map(|c| &c.events).collect();
        assert_eq!(pieces.len(), 3);
        for w in pieces.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
        assert_eq!(pieces[0].start, e.start);
        assert_eq!(pieces[2].end, e.end);
    }
}
