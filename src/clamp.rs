// EUVSim - Bounds clamper
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Keeping sampled values within plausible limits.

use crate::catalog::{round_to, Catalog, Parameter};
use crate::dataset::SampleFrame;
use crate::degrade::max_severity;
use crate::event::DegradationEvent;

/// Number of standard deviations allowed around the baseline.
pub const SIGMA_LIMIT: f64 = 3.0;

/// Allowed `(low, high)` range for a parameter.
///
/// With a degradation severity the lower bound drops to the fully degraded
/// baseline minus the same margin.
pub fn bounds(param: &Parameter, severity: Option<f64>) -> (f64, f64) {
    let margin = SIGMA_LIMIT * param.std_dev();
    let high = param.baseline + margin;
    let low = match severity {
        Some(s) => param.baseline * (1.0 - s) - margin,
        None => param.baseline - margin,
    };
    (low, high)
}

/// Clamp and round every present value. Noiseless parameters are left
/// as sampled.
///
/// `events` are the chunk's events; the largest severity per parameter
/// widens that parameter's lower bound.
pub fn clamp_frame(
    frame: &mut SampleFrame,
    catalog: &Catalog,
    events: &[DegradationEvent],
    decimal_places: u32,
) -> usize {
    let mut clamped = 0;
    for column in frame.columns.iter_mut() {
        let Some(param) = catalog.get(&column.name) else {
            continue;
        };
        if param.is_noiseless() {
            continue;
        }
        let (low, high) = bounds(param, max_severity(events, &param.name));

        for v in column.values.iter_mut().flatten() {
            // max/min rather than f64::clamp: inverted bounds must not panic.
            let limited = v.max(low).min(high);
            if limited != *v {
                clamped += 1;
            }
            *v = round_to(limited, decimal_places);
        }
    }
    clamped
}
