// EUVSim - Degradation events
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Degradation event records.

use crate::curve::CurveKind;
use crate::timeline::secs_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A window `[start, end)` during which one parameter is attenuated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationEvent {
    /// Affected parameter.
    pub parameter: String,
    /// Window start (inclusive).
    pub start: DateTime<Utc>,
    /// Window end (exclusive).
    pub end: DateTime<Utc>,
    /// Fraction of the value removed at full effect.
    pub severity: f64,
    /// Curve shape.
    pub curve: CurveKind,
}

/// Identity of an event record for deduplication.
///
/// Severity is compared bitwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub parameter: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub severity_bits: u64,
    pub curve: CurveKind,
}

impl DegradationEvent {
    /// Create an event.
    pub fn new(
        parameter: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        severity: f64,
        curve: CurveKind,
    ) -> Self {
        Self {
            parameter: parameter.to_string(),
            start,
            end,
            severity,
            curve,
        }
    }

    /// Window length in seconds.
    pub fn duration_secs(&self) -> f64 {
        secs_between(self.start, self.end)
    }

    /// True when `ts` lies in `[start, end)`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// True when the half-open windows intersect.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }

    /// Copy restricted to `[start, end)`, or `None` if the windows do not
    /// intersect.
    pub fn clipped(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if !self.overlaps(start, end) {
            return None;
        }
        Some(Self {
            start: self.start.max(start),
            end: self.end.min(end),
            ..self.clone()
        })
    }

    /// Elapsed fraction of the window at `ts`, clamped to `[0, 1]`.
    /// A zero-length window yields 0.
    pub fn elapsed_fraction(&self, ts: DateTime<Utc>) -> f64 {
        let span = self.duration_secs();
        if span <= 0.0 {
            return 0.0;
        }
        (secs_between(self.start, ts) / span).clamp(0.0, 1.0)
    }

    /// Deduplication key.
    pub fn key(&self) -> EventKey {
        EventKey {
            parameter: self.parameter.clone(),
            start: self.start,
            end: self.end,
            severity_bits: self.severity.to_bits(),
            curve: self.curve,
        }
    }
}
