// EUVSim - Timestamp sequencer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sample time generation and second/`chrono` conversions.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Tolerance used when turning `duration * rate` into a sample count, so that
/// products like `0.29 * 100.0 = 28.999999999999996` still yield 29 samples.
const COUNT_EPSILON: f64 = 1e-9;

/// Convert fractional seconds to a `chrono::Duration` (nanosecond resolution).
pub fn secs(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * 1e9).round() as i64)
}

/// Seconds elapsed from `from` to `to` (negative if `to` is earlier).
pub fn secs_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Number of samples in an interval: `floor(duration * rate)`.
pub fn sample_count(duration_secs: f64, sampling_rate: f64) -> usize {
    if !(duration_secs > 0.0) || !(sampling_rate > 0.0) {
        return 0;
    }
    (duration_secs * sampling_rate + COUNT_EPSILON).floor() as usize
}

/// Ordered sample times `start + i / rate` for `i in 0..floor(duration * rate)`.
///
/// Every timestamp is computed from `start` directly rather than by
/// accumulation, so long intervals do not drift.
pub fn generate_timestamps(
    start: DateTime<Utc>,
    duration_secs: f64,
    sampling_rate: f64,
) -> Vec<DateTime<Utc>> {
    let count = sample_count(duration_secs, sampling_rate);
    (0..count)
        .map(|i| start + secs(i as f64 / sampling_rate))
        .collect()
}

/// RFC 3339 UTC rendering used in every CSV file.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 / ISO-8601 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Second-resolution rendering used in log lines.
pub fn format_log_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
