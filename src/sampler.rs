// EUVSim - Noise sampler
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Baseline + Gaussian noise synthesis.

use crate::catalog::{round_to, Catalog};
use crate::dataset::{Column, SampleFrame};
use crate::error::{Result, SimError};
use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

/// Sample every parameter at every timestamp with a generator seeded from
/// `seed`. Same seed, catalog and timestamp count give identical values.
pub fn sample_noise(
    timestamps: Vec<DateTime<Utc>>,
    catalog: &Catalog,
    seed: u64,
    decimal_places: u32,
) -> Result<SampleFrame> {
    let mut rng = StdRng::seed_from_u64(seed);
    sample_noise_with(timestamps, catalog, decimal_places, &mut rng)
}

/// Sample with a caller-owned generator.
///
/// Parameters are drawn one after another in catalog order, each taking
/// one draw per timestamp.
pub fn sample_noise_with(
    timestamps: Vec<DateTime<Utc>>,
    catalog: &Catalog,
    decimal_places: u32,
    rng: &mut (impl Rng + ?Sized),
) -> Result<SampleFrame> {
    let n = timestamps.len();
    let mut frame = SampleFrame::new(timestamps);

    for param in catalog.iter() {
        let normal =
            Normal::new(param.baseline, param.std_dev()).map_err(|e| SimError::Sampling {
                parameter: param.name.clone(),
                reason: e.to_string(),
            })?;
        let values = (0..n)
            .map(|_| Some(round_to(normal.sample(&mut *rng), decimal_places)))
            .collect();
        frame.push_column(Column::new(&param.name, values))?;
    }

    Ok(frame)
}
