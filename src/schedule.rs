// EUVSim - Degradation event scheduler
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Random placement of degradation windows over the whole run.
//!
//! Each spec gets exactly `count` placement attempts. A candidate that
//! overlaps an event already placed for the same parameter is dropped,
//! not redrawn, so a crowded spec may place fewer events than requested.
//! The shortfall is reported through [`SpecOutcome`].

use crate::config::DegradationSpec;
use crate::event::DegradationEvent;
use crate::timeline::secs;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Placement statistics for one spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecOutcome {
    /// Target parameter.
    pub parameter: String,
    /// Attempts requested (negative counts reported as 0).
    pub requested: usize,
    /// Events actually placed.
    pub placed: usize,
}

impl SpecOutcome {
    /// Attempts that were dropped.
    pub fn skipped(&self) -> usize {
        self.requested.saturating_sub(self.placed)
    }
}

/// Output of a scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Placed events, in placement order.
    pub events: Vec<DegradationEvent>,
    /// One entry per input spec, in input order.
    pub outcomes: Vec<SpecOutcome>,
}

impl Schedule {
    /// Total attempts requested.
    pub fn requested(&self) -> usize {
        self.outcomes.iter().map(|o| o.requested).sum()
    }

    /// Total events placed.
    pub fn placed(&self) -> usize {
        self.events.len()
    }
}

/// Place degradation windows over `[run_start, run_start + total_secs)`.
pub fn schedule_events<R: Rng + ?Sized>(
    specs: &[DegradationSpec],
    run_start: DateTime<Utc>,
    total_secs: f64,
    rng: &mut R,
) -> Schedule {
    let mut schedule = Schedule::default();
    let mut by_parameter: HashMap<&str, Vec<usize>> = HashMap::new();

    for spec in specs {
        let requested = spec.count.max(0) as usize;
        let mut placed = 0;

        let feasible = spec.window_secs > 0.0 && total_secs >= spec.window_secs;
        if feasible {
            let max_start = total_secs - spec.window_secs;
            for _ in 0..requested {
                let offset = rng.gen_range(0.0..=max_start);
                let start = run_start + secs(offset);
                let end = start + secs(spec.window_secs);

                let taken = by_parameter.entry(spec.parameter.as_str()).or_default();
                if taken
                    .iter()
                    .any(|&i| schedule.events[i].overlaps(start, end))
                {
                    debug!(parameter = %spec.parameter, offset, "placement overlaps, skipped");
                    continue;
                }

                taken.push(schedule.events.len());
                schedule.events.push(DegradationEvent::new(
                    &spec.parameter,
                    start,
                    end,
                    spec.severity,
                    spec.curve,
                ));
                placed += 1;
            }
        }

        let outcome = SpecOutcome {
            parameter: spec.parameter.clone(),
            requested,
            placed,
        };
        if outcome.skipped() > 0 {
            info!(
                parameter = %outcome.parameter,
                requested = outcome.requested,
                placed = outcome.placed,
                "degradation spec partially placed"
            );
        }
        schedule.outcomes.push(outcome);
    }

    info!(
        requested = schedule.requested(),
        placed = schedule.placed(),
        "degradation events scheduled"
    );
    schedule
}
