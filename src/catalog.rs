// EUVSim - Parameter catalog
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Simulated signal channels and their statistical baselines.
//!
//! A [`Catalog`] is built once per run (generated or loaded from the
//! configuration file) and shared read-only by every chunk. Its iteration
//! order is the column order of every dataset and the order of log lines
//! within a sample.

use crate::error::{Result, SimError};
use indexmap::IndexMap;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lower bound of generated baselines.
pub const BASELINE_MIN: f64 = 10.0;
/// Upper bound of generated baselines.
pub const BASELINE_MAX: f64 = 1000.0;
/// Unit assigned to generated parameters.
pub const DEFAULT_UNIT: &str = "units";
/// Variation range used when the configuration supplies none.
pub const DEFAULT_VARIATION_RANGE: (f64, f64) = (0.01, 0.10);

/// Subsystem labels used to synthesize parameter names.
pub const SUBSYSTEM_CATEGORIES: &[&str] = &[
    "Laser_Source",
    "Beam_Control",
    "Optics_Alignment",
    "Thermal_Management",
    "Feedback_Control",
    "Power_Supply",
    "Safety_Systems",
    "Environmental_Controls",
    "Diagnostics",
    "Pulse_Generation",
    "Wavelength_Control",
    "Beam_Quality",
    "Focus_Control",
    "Scanning_System",
    "Modulation_System",
    "Cooling_System",
    "Vibration_Isolation",
    "Optical_Path",
    "Data_Processing",
    "Maintenance_Systems",
    "Communication_Interface",
    "Spectroscopy",
    "Beam_Shaping",
    "Laser_Cavities",
    "Beam_Steering",
    "Polarization_Control",
    "Vacuum_System",
    "Motion_Stage_Control",
    "Illumination_System",
    "Reticle_Handling",
    "Wafer_Alignment",
    "Metrology",
    "Energy_Management",
    "Optical_Coatings",
    "Phase_Control",
    "Thermal_Expansion_Compensation",
    "Alignment_Sensors",
    "High_Precision_Mechanics",
    "Laser_Amplification",
    "Adaptive_Optics",
    "Optical_Calibration",
    "Photomask_Handling",
    "Power_Stabilization",
    "Surface_Inspection",
    "Electromagnetic_Shielding",
    "Process_Control_Systems",
    "Component_Monitoring",
    "High_Voltage_Safety",
    "Real_Time_Monitoring",
    "Light_Intensity_Control",
    "Vacuum_Pump_Monitoring",
    "Ion_Beam_Control",
    "Nanopositioning",
    "Wafer_Exposure",
    "Mask_Inspection",
    "Plasma_Control",
    "Gas_Flow_Regulation",
    "Pressure_Management",
    "Contamination_Control",
    "Emission_Control",
    "Frequency_Stabilization",
    "Machine_Condition_Monitoring",
    "Wafer_Clamping",
    "Voltage_Regulation",
    "Temperature_Sensors",
    "Pressure_Sensors",
    "Humidity_Sensors",
    "Wavefront_Correction",
    "Beam_Profile_Analysis",
    "Vacuum_Leak_Detection",
    "Thermoelectric_Cooling",
    "Laser_Damage_Mitigation",
    "Multi_Axis_Control",
    "Plasma_Monitoring",
    "Magnetic_Field_Shielding",
    "Component_Cooling",
    "Dynamic_Laser_Control",
];

/// Round `value` to `decimal_places` digits.
///
/// Precisions beyond what an `f64` can hold are returned unchanged.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    if !value.is_finite() || decimal_places > 15 {
        return value;
    }
    let scale = 10f64.powi(decimal_places as i32);
    (value * scale).round() / scale
}

/// A simulated signal channel.
///
/// On disk the name is the catalog key and the remaining fields form the
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Unique name (column header).
    #[serde(skip)]
    pub name: String,
    /// Mean of the sampling distribution.
    #[serde(rename = "default")]
    pub baseline: f64,
    /// Standard deviation as a fraction of the baseline.
    #[serde(rename = "variation_prc", default)]
    pub variation: f64,
    /// Display unit.
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Subsystem label.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

impl Parameter {
    /// Create a parameter with the default unit and no category.
    pub fn new(name: &str, baseline: f64, variation: f64) -> Self {
        Self {
            name: name.to_string(),
            baseline,
            variation,
            unit: DEFAULT_UNIT.to_string(),
            category: String::new(),
        }
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// Noise standard deviation, `|baseline * variation|`.
    pub fn std_dev(&self) -> f64 {
        (self.baseline * self.variation).abs()
    }

    /// Zero-noise channels are exempt from degradation and clamping.
    pub fn is_noiseless(&self) -> bool {
        self.variation == 0.0
    }
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// Ordered set of parameters keyed by name.
///
/// Equality compares entries in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    from = "IndexMap<String, Parameter>",
    into = "IndexMap<String, Parameter>"
)]
pub struct Catalog {
    params: IndexMap<String, Parameter>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Names must be unique.
    pub fn push(&mut self, param: Parameter) -> Result<()> {
        if self.params.contains_key(&param.name) {
            return Err(SimError::config(format!(
                "duplicate parameter name: {}",
                param.name
            )));
        }
        self.params.insert(param.name.clone(), param);
        Ok(())
    }

    /// Add a parameter (builder form).
    pub fn with(mut self, param: Parameter) -> Result<Self> {
        self.push(param)?;
        Ok(self)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over parameters in column order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Parameter at a column position.
    pub fn get_index(&self, index: usize) -> Option<&Parameter> {
        self.params.get_index(index).map(|(_, p)| p)
    }

    /// Column index of a parameter.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.get_index_of(name)
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// Check whether a parameter exists.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Parameter names in column order.
    pub fn names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.params.iter().eq(other.params.iter())
    }
}

impl From<IndexMap<String, Parameter>> for Catalog {
    fn from(mut params: IndexMap<String, Parameter>) -> Self {
        for (name, param) in params.iter_mut() {
            param.name.clone_from(name);
        }
        Self { params }
    }
}

impl From<Catalog> for IndexMap<String, Parameter> {
    fn from(catalog: Catalog) -> Self {
        catalog.params
    }
}

/// How to synthesize a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSpec {
    /// Target number of parameters.
    pub num_parameters: usize,
    /// Names that must be present; generated first.
    #[serde(default)]
    pub desired_parameters: Vec<String>,
    /// Candidate `(min, max)` ranges for the variation fraction.
    #[serde(default)]
    pub variation_ranges: Vec<(f64, f64)>,
}

impl Default for CatalogSpec {
    fn default() -> Self {
        Self {
            num_parameters: 200,
            desired_parameters: Vec::new(),
            variation_ranges: vec![DEFAULT_VARIATION_RANGE],
        }
    }
}

impl CatalogSpec {
    /// Create a spec for `num_parameters` channels.
    pub fn new(num_parameters: usize) -> Self {
        Self {
            num_parameters,
            ..Default::default()
        }
    }

    /// Require these names.
    pub fn with_desired<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.desired_parameters = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set candidate variation ranges.
    pub fn with_variation_ranges(mut self, ranges: Vec<(f64, f64)>) -> Self {
        self.variation_ranges = ranges;
        self
    }

    /// Check ranges are well formed.
    pub fn validate(&self) -> Result<()> {
        for &(lo, hi) in &self.variation_ranges {
            if !(lo >= 0.0) || !(hi >= lo) || !hi.is_finite() {
                return Err(SimError::config(format!(
                    "invalid variation range ({}, {})",
                    lo, hi
                )));
            }
        }
        Ok(())
    }
}

/// Generate a catalog from the built-in subsystem categories.
pub fn generate_catalog(
    spec: &CatalogSpec,
    decimal_places: u32,
    rng: &mut (impl Rng + ?Sized),
) -> Result<Catalog> {
    generate_catalog_with_categories(spec, SUBSYSTEM_CATEGORIES, decimal_places, rng)
}

/// Generate a catalog, naming filler parameters `{category}_param_{n}`.
pub fn generate_catalog_with_categories(
    spec: &CatalogSpec,
    categories: &[&str],
    decimal_places: u32,
    rng: &mut (impl Rng + ?Sized),
) -> Result<Catalog> {
    spec.validate()?;
    let ranges: &[(f64, f64)] = if spec.variation_ranges.is_empty() {
        &[DEFAULT_VARIATION_RANGE]
    } else {
        &spec.variation_ranges
    };

    let mut catalog = Catalog::new();

    for name in &spec.desired_parameters {
        if catalog.contains(name) {
            continue;
        }
        let category = categories.choose(rng).copied().unwrap_or_default();
        let param = draw_parameter(name, category, ranges, decimal_places, rng);
        catalog.push(param)?;
    }

    if catalog.len() < spec.num_parameters && categories.is_empty() {
        return Err(SimError::config(format!(
            "cannot reach {} parameters: no categories to synthesize names from",
            spec.num_parameters
        )));
    }

    let mut counters: HashMap<&str, usize> = categories.iter().map(|c| (*c, 1)).collect();
    while catalog.len() < spec.num_parameters {
        let category = match categories.choose(rng) {
            Some(c) => *c,
            None => break,
        };
        let counter = counters.entry(category).or_insert(1);
        let name = format!("{}_param_{}", category, counter);
        *counter += 1;

        if catalog.contains(&name) {
            continue;
        }
        let param = draw_parameter(&name, category, ranges, decimal_places, rng);
        catalog.push(param)?;
    }

    Ok(catalog)
}

fn draw_parameter(
    name: &str,
    category: &str,
    ranges: &[(f64, f64)],
    decimal_places: u32,
    rng: &mut (impl Rng + ?Sized),
) -> Parameter {
    let baseline = round_to(rng.gen_range(BASELINE_MIN..=BASELINE_MAX), decimal_places);
    let (lo, hi) = ranges
        .choose(rng)
        .copied()
        .unwrap_or(DEFAULT_VARIATION_RANGE);
    let variation = round_to(rng.gen_range(lo..=hi), decimal_places);
    Parameter::new(name, baseline, variation).with_category(category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.235, 0), 1.0);
        assert!(round_to(f64::NAN, 2).is_nan());
        assert_eq!(round_to(0.1234567, 20), 0.1234567);
    }

    #[test]
    fn test_generate_count_and_desired() {
        let spec = CatalogSpec::new(50).with_desired(["Main_Laser_Power", "Pulse_Frequency"]);
        let catalog = generate_catalog(&spec, 4, &mut test_rng()).unwrap();

        assert_eq!(catalog.len(), 50);
        assert_eq!(catalog.get_index(0).unwrap().name, "Main_Laser_Power");
        assert_eq!(catalog.get_index(1).unwrap().name, "Pulse_Frequency");
        assert_eq!(catalog.index_of("Pulse_Frequency"), Some(1));
        for p in catalog.iter() {
            assert!(p.baseline >= BASELINE_MIN && p.baseline <= BASELINE_MAX);
            assert!(p.variation >= 0.01 && p.variation <= 0.10);
            assert_eq!(p.unit, "units");
        }
    }

    #[test]
    fn test_desired_exceeding_count_all_kept() {
        let spec = CatalogSpec::new(1).with_desired(["a", "b", "a", "c"]);
        let catalog = generate_catalog(&spec, 2, &mut test_rng()).unwrap();
        assert_eq!(catalog.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filler_names_follow_category_counter() {
        let spec = CatalogSpec::new(3);
        let catalog =
            generate_catalog_with_categories(&spec, &["Vacuum_System"], 2, &mut test_rng())
                .unwrap();
        assert_eq!(
            catalog.names(),
            vec![
                "Vacuum_System_param_1",
                "Vacuum_System_param_2",
                "Vacuum_System_param_3"
            ]
        );
    }

    #[test]
    fn test_filler_skips_collisions() {
        let spec = CatalogSpec::new(3).with_desired(["Vacuum_System_param_1"]);
        let catalog =
            generate_catalog_with_categories(&spec, &["Vacuum_System"], 2, &mut test_rng())
                .unwrap();
        assert_eq!(
            catalog.names(),
            vec![
                "Vacuum_System_param_1",
                "Vacuum_System_param_2",
                "Vacuum_System_param_3"
            ]
        );
    }

    #[test]
    fn test_unreachable_count() {
        let spec = CatalogSpec::new(5).with_desired(["only"]);
        let err = generate_catalog_with_categories(&spec, &[], 2, &mut test_rng()).unwrap_err();
        assert!(err.is_config());

        // Reachable through desired names alone.
        let spec = CatalogSpec::new(1).with_desired(["only"]);
        assert!(generate_catalog_with_categories(&spec, &[], 2, &mut test_rng()).is_ok());
    }

    #[test]
    fn test_invalid_range() {
        let spec = CatalogSpec::new(5).with_variation_ranges(vec![(0.2, 0.1)]);
        assert!(generate_catalog(&spec, 2, &mut test_rng()).is_err());
    }

    #[test]
    fn test_zero_range_gives_noiseless() {
        let spec = CatalogSpec::new(4).with_variation_ranges(vec![(0.0, 0.0)]);
        let catalog = generate_catalog(&spec, 2, &mut test_rng()).unwrap();
        assert!(catalog.iter().all(|p| p.is_noiseless()));
    }

    #[test]
    fn test_reproducible_with_seed() {
        let spec = CatalogSpec::new(20);
        let a = generate_catalog(&spec, 4, &mut test_rng()).unwrap();
        let b = generate_catalog(&spec, 4, &mut test_rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_push() {
        let mut catalog = Catalog::new();
        catalog.push(Parameter::new("x", 1.0, 0.1)).unwrap();
        assert!(catalog.push(Parameter::new("x", 2.0, 0.1)).is_err());
        assert_eq!(catalog.get("x").unwrap().baseline, 1.0);
    }

    #[test]
    fn test_json_preserves_order() {
        let json = r#"{
            "Zeta": {"default": 100.0, "variation_prc": 0.01, "unit": "W"},
            "Alpha": {"default": 5.0, "variation_prc": 0.0},
            "Mid": {"default": 50.0, "variation_prc": 0.02, "unit": "nm", "category": "Optics"}
        }"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.names(), vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(catalog.get("Alpha").unwrap().unit, "units");
        assert_eq!(catalog.get("Mid").unwrap().category, "Optics");

        let out = serde_json::to_string(&catalog).unwrap();
        assert!(out.find("Zeta").unwrap() < out.find("Alpha").unwrap());
        assert!(out.contains("\"variation_prc\":0.02"));
        let back: Catalog = serde_json::from_str(&out).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn test_json_duplicate_key_keeps_position_of_first() {
        let json = r#"{"A": {"default": 1.0}, "B": {"default": 3.0}, "A": {"default": 2.0}}"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.names(), vec!["A", "B"]);
        assert_eq!(catalog.get("A").unwrap().baseline, 2.0);
    }

    #[test]
    fn test_order_matters_for_equality() {
        let ab = Catalog::new()
            .with(Parameter::new("a", 1.0, 0.1))
            .unwrap()
            .with(Parameter::new("b", 2.0, 0.1))
            .unwrap();
        let ba = Catalog::new()
            .with(Parameter::new("b", 2.0, 0.1))
            .unwrap()
            .with(Parameter::new("a", 1.0, 0.1))
            .unwrap();
        assert_ne!(ab, ba);
    }
}
