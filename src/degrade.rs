// EUVSim - Degradation applicator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Applying degradation windows to a sampled frame.
//!
//! Inside a window a value is scaled by `1 - severity * f(t)`, where `t` is
//! the elapsed fraction of the (chunk-clipped) window and `f` the curve
//! factor. [`crate::curve::CurveKind::Missing`] blanks the value instead.

use crate::catalog::Catalog;
use crate::dataset::SampleFrame;
use crate::event::DegradationEvent;
use tracing::debug;

/// Apply `events` to `frame` in place.
///
/// Returns the events that touched at least one sample. Events on unknown
/// parameters and on noiseless parameters (variation 0) are skipped.
pub fn apply_degradations(
    frame: &mut SampleFrame,
    catalog: &Catalog,
    events: &[DegradationEvent],
) -> Vec<DegradationEvent> {
    let mut applied = Vec::new();

    for event in events {
        let Some(param) = catalog.get(&event.parameter) else {
            debug!(parameter = %event.parameter, "event on unknown parameter ignored");
            continue;
        };
        if param.is_noiseless() {
            continue;
        }
        let Some(col) = frame.columns.iter().position(|c| c.name == event.parameter) else {
            continue;
        };

        let column = &mut frame.columns[col];
        let mut touched = 0usize;
        for (row, ts) in frame.timestamps.iter().enumerate() {
            if !event.contains(*ts) {
                continue;
            }
            touched += 1;
            let t_frac = event.elapsed_fraction(*ts);
            match event.curve.factor(t_frac) {
                None => {
                    column.values[row] = None;
                    column.degraded[row] = false;
                }
                Some(f) => {
                    if let Some(v) = column.values[row].as_mut() {
                        *v *= 1.0 - event.severity * f;
                    }
                    column.degraded[row] = f > 0.0;
                }
            }
        }

        if touched > 0 {
            applied.push(event.clone());
        }
    }

    applied
}

/// Largest severity among `events` targeting `parameter`, if any.
pub fn max_severity(events: &[DegradationEvent], parameter: &str) -> Option<f64> {
    events
        .iter()
        .filter(|e| e.parameter == parameter)
        .map(|e| e.severity)
        .fold(None, |acc, s| Some(acc.map_or(s, |m: f64| m.max(s))))
}
