// EUVSim - Run configuration
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Typed run configuration.
//!
//! Configuration files are JSON. The record may sit at the top level or be
//! wrapped under a subsystem key:
//!
//! ```json
//! {
//!   "Laser_Subsystem": {
//!     "module_name": "Laser_Subsystem.simple.5",
//!     "sampling_rate": 20,
//!     "duration": 20000,
//!     "start_time": "2025-01-21T00:00:00Z",
//!     "num_threads": 10,
//!     "decimal_places": 10,
//!     "degradation_parameters": [ ... ],
//!     "parameters": { "Main_Laser_Power": {"default": 1000.0, "variation_prc": 0.01, "unit": "W"} }
//!   }
//! }
//! ```

use crate::catalog::{Catalog, CatalogSpec};
use crate::curve::CurveKind;
use crate::error::{Result, SimError};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Section name used by the stock laser configuration.
pub const LASER_SECTION: &str = "Laser_Subsystem";

/// Channels that the stock laser configuration always carries.
pub const LASER_KEY_PARAMETERS: [&str; 4] = [
    "Main_Laser_Power",
    "Laser_Wavelength",
    "Beam_Quality_M2",
    "Pulse_Frequency",
];

fn default_decimal_places() -> u32 {
    2
}

fn default_threads() -> usize {
    1
}

/// One requested family of degradation episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationSpec {
    /// Target parameter.
    pub parameter: String,
    /// Fraction of the value removed at full effect (0..1).
    #[serde(rename = "degradation_percent", default)]
    pub severity: f64,
    /// Window length in seconds.
    #[serde(rename = "duration_sec", default)]
    pub window_secs: f64,
    /// Number of placements to attempt.
    #[serde(rename = "number_of_degradations", default)]
    pub count: i64,
    /// Curve shape.
    #[serde(rename = "degradation_type", default)]
    pub curve: CurveKind,
}

impl DegradationSpec {
    /// Create a spec for a single episode.
    pub fn new(parameter: &str, severity: f64, window_secs: f64, curve: CurveKind) -> Self {
        Self {
            parameter: parameter.to_string(),
            severity,
            window_secs,
            count: 1,
            curve,
        }
    }

    /// Set the number of placements to attempt.
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }
}

/// Complete configuration of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Module name; used to name the output files.
    pub module_name: String,
    /// Samples per second.
    pub sampling_rate: f64,
    /// Run duration in seconds.
    pub duration: f64,
    /// Timestamp of the first sample.
    pub start_time: DateTime<Utc>,
    /// Worker count, also the number of chunks.
    #[serde(default = "default_threads")]
    pub num_threads: usize,
    /// Rounding precision for sampled values.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Requested degradation episodes.
    #[serde(default)]
    pub degradation_parameters: Vec<DegradationSpec>,
    /// Parameter catalog.
    #[serde(default)]
    pub parameters: Catalog,
    /// Run seed. Chunk `i` samples with `seed + i`; catalog and schedule
    /// draws use the seed directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Catalog generation settings, used when `parameters` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogSpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            module_name: LASER_SECTION.to_string(),
            sampling_rate: 20.0,
            duration: 20_000.0,
            start_time: Utc.with_ymd_and_hms(2025, 1, 21, 0, 0, 0).single().unwrap_or_default(),
            num_threads: 10,
            decimal_places: 10,
            degradation_parameters: Vec::new(),
            parameters: Catalog::new(),
            seed: None,
            catalog: None,
        }
    }
}

impl SimulationConfig {
    /// Create a configuration with defaults and the given module name.
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            ..Default::default()
        }
    }

    /// Stock laser subsystem run: 1000 generated channels including the
    /// key laser parameters, one cosine episode on `Main_Laser_Power`.
    pub fn laser_default() -> Self {
        Self {
            module_name: "Laser_Subsystem.simple.5".to_string(),
            catalog: Some(
                CatalogSpec::new(1000)
                    .with_desired(LASER_KEY_PARAMETERS)
                    .with_variation_ranges(vec![(0.0, 0.005)]),
            ),
            degradation_parameters: vec![DegradationSpec::new(
                "Main_Laser_Power",
                0.1,
                1000.0,
                CurveKind::Cosine,
            )],
            ..Default::default()
        }
    }

    /// Set sampling rate in Hz.
    pub fn with_sampling_rate(mut self, hz: f64) -> Self {
        self.sampling_rate = hz;
        self
    }

    /// Set duration in seconds.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = secs;
        self
    }

    /// Set start time.
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = start;
        self
    }

    /// Set worker/chunk count.
    pub fn with_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    /// Set rounding precision.
    pub fn with_decimal_places(mut self, places: u32) -> Self {
        self.decimal_places = places;
        self
    }

    /// Set the parameter catalog.
    pub fn with_parameters(mut self, catalog: Catalog) -> Self {
        self.parameters = catalog;
        self
    }

    /// Set catalog generation settings.
    pub fn with_catalog_spec(mut self, spec: CatalogSpec) -> Self {
        self.catalog = Some(spec);
        self
    }

    /// Add a degradation spec.
    pub fn with_degradation(mut self, spec: DegradationSpec) -> Self {
        self.degradation_parameters.push(spec);
        self
    }

    /// Set run seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run seed, `0` when unset.
    pub fn base_seed(&self) -> u64 {
        self.seed.unwrap_or(0)
    }

    /// Duration of each chunk in seconds.
    pub fn chunk_duration(&self) -> f64 {
        self.duration / self.num_threads.max(1) as f64
    }

    /// Module name made safe for file names.
    pub fn module_name_safe(&self) -> String {
        self.module_name
            .chars()
            .map(|c| {
                if c.is_whitespace() || c == '/' || c == '\\' {
                    '_'
                } else {
                    c
                }
            })
            .collect()
    }

    /// Check every field. Fails fast with [`SimError::Config`].
    pub fn validate(&self) -> Result<()> {
        if self.module_name.trim().is_empty() {
            return Err(SimError::config("module_name must not be empty"));
        }
        if !(self.sampling_rate > 0.0) || !self.sampling_rate.is_finite() {
            return Err(SimError::config(format!(
                "sampling_rate must be positive, got {}",
                self.sampling_rate
            )));
        }
        if !(self.duration > 0.0) || !self.duration.is_finite() {
            return Err(SimError::config(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        if self.num_threads == 0 {
            return Err(SimError::config("num_threads must be at least 1"));
        }
        for p in self.parameters.iter() {
            if !p.baseline.is_finite() {
                return Err(SimError::config(format!(
                    "parameter {} has a non-finite default",
                    p.name
                )));
            }
            if !(p.variation >= 0.0) || !p.variation.is_finite() {
                return Err(SimError::config(format!(
                    "parameter {} has invalid variation_prc {}",
                    p.name, p.variation
                )));
            }
        }
        if let Some(spec) = &self.catalog {
            spec.validate()?;
        }
        for d in &self.degradation_parameters {
            if d.parameter.is_empty() {
                return Err(SimError::config("degradation spec without parameter"));
            }
            if !(0.0..=1.0).contains(&d.severity) {
                return Err(SimError::config(format!(
                    "degradation_percent for {} must be within [0, 1], got {}",
                    d.parameter, d.severity
                )));
            }
            if !d.window_secs.is_finite() {
                return Err(SimError::config(format!(
                    "duration_sec for {} is not finite",
                    d.parameter
                )));
            }
            if !self.parameters.is_empty() && !self.parameters.contains(&d.parameter) {
                warn!(parameter = %d.parameter, "degradation target is not in the catalog");
            }
        }
        Ok(())
    }

    /// Parse a configuration from JSON text.
    ///
    /// Object order is kept, so the catalog keeps its column order.
    /// `section` selects a wrapped record; without it the record is taken
    /// from the top level, or from the only entry of a single-key wrapper.
    pub fn from_json_str(json: &str, section: Option<&str>) -> Result<Self> {
        let json = json.trim_start_matches('\u{feff}');
        let root: Value = serde_json::from_str(json)?;
        let record = select_section(root, section)?;
        let config: SimulationConfig =
            serde_json::from_value(record).map_err(|e| SimError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>, section: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| SimError::persistence(path, e))?;
        Self::from_json_str(&json, section)
    }

    /// Serialize, optionally wrapped under `section`.
    pub fn to_json(&self, section: Option<&str>) -> Result<String> {
        let json = match section {
            Some(name) => serde_json::to_string_pretty(&BTreeMap::from([(name, self)]))?,
            None => serde_json::to_string_pretty(self)?,
        };
        Ok(json)
    }

    /// Save to a JSON file, optionally wrapped under `section`.
    pub fn to_json_file(&self, path: impl AsRef<Path>, section: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json(section)?;
        std::fs::write(path, json).map_err(|e| SimError::persistence(path, e))
    }
}

fn select_section(root: Value, section: Option<&str>) -> Result<Value> {
    let mut map = match root {
        Value::Object(map) => map,
        _ => return Err(SimError::config("configuration must be a JSON object")),
    };
    if let Some(name) = section {
        return map
            .remove(name)
            .ok_or_else(|| SimError::config(format!("section {} not found", name)));
    }
    if map.contains_key("module_name") {
        return Ok(Value::Object(map));
    }
    if map.len() == 1 {
        if let Some((_, value)) = map.into_iter().next() {
            return Ok(value);
        }
    }
    Err(SimError::config(
        "ambiguous configuration: select a section explicitly",
    ))
}
