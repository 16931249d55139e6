// EUVSim - Degradation curves
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shape functions mapping elapsed window fraction to a severity multiplier.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Rate of the exponential curve; reaches ~0.95 at the end of the window.
const EXPONENTIAL_RATE: f64 = 3.0;

/// Shape of a degradation episode.
///
/// Configuration files carry the kind as a string. Unknown strings (and the
/// `"gradual"` alias) become [`CurveKind::Linear`] during deserialization, so
/// the core only ever sees the closed set below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum CurveKind {
    /// Factor grows linearly from 0 to 1.
    #[default]
    Linear,
    /// Factor is 0 for the first half of the window, then 1.
    Step,
    /// Smooth S-curve `(1 - cos(pi * t)) / 2`.
    Cosine,
    /// Fast onset `1 - e^(-3t)`.
    Exponential,
    /// Full effect for the entire window.
    Instantaneous,
    /// Values disappear for the duration of the window.
    Missing,
}

impl CurveKind {
    /// All kinds, in declaration order.
    pub const ALL: [CurveKind; 6] = [
        CurveKind::Linear,
        CurveKind::Step,
        CurveKind::Cosine,
        CurveKind::Exponential,
        CurveKind::Instantaneous,
        CurveKind::Missing,
    ];

    /// Curve factor at `t_frac` (clamped to `[0, 1]`).
    ///
    /// Returns `None` for [`CurveKind::Missing`], whose samples are dropped
    /// rather than attenuated.
    pub fn factor(&self, t_frac: f64) -> Option<f64> {
        let t = t_frac.clamp(0.0, 1.0);
        match self {
            CurveKind::Linear => Some(t),
            CurveKind::Step => Some(if t >= 0.5 { 1.0 } else { 0.0 }),
            CurveKind::Cosine => Some((1.0 - (PI * t).cos()) / 2.0),
            CurveKind::Exponential => Some(1.0 - (-EXPONENTIAL_RATE * t).exp()),
            CurveKind::Instantaneous => Some(1.0),
            CurveKind::Missing => None,
        }
    }

    /// Lowercase name as written in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveKind::Linear => "linear",
            CurveKind::Step => "step",
            CurveKind::Cosine => "cosine",
            CurveKind::Exponential => "exponential",
            CurveKind::Instantaneous => "instantaneous",
            CurveKind::Missing => "missing",
        }
    }
}

impl From<&str> for CurveKind {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "step" => CurveKind::Step,
            "cosine" => CurveKind::Cosine,
            "exponential" => CurveKind::Exponential,
            "instantaneous" => CurveKind::Instantaneous,
            "missing" => CurveKind::Missing,
            // "linear", "gradual" and anything unrecognised
            _ => CurveKind::Linear,
        }
    }
}

impl From<String> for CurveKind {
    fn from(s: String) -> Self {
        CurveKind::from(s.as_str())
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
