// EUVSim - Degradation-aware telemetry generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # EUVSim - EUV machine telemetry simulator
//!
//! Generates synthetic, labelled telemetry for an EUV lithography subsystem:
//! a timestamped CSV of every parameter plus a human-readable event log,
//! with randomly placed degradation episodes shaping the signals.
//!
//! ## Key Features
//!
//! - **Reproducible**: every random draw comes from a seeded generator
//! - **Chunk-parallel**: the run is split in equal time chunks processed on a worker pool
//! - **Degradation curves**: linear, step, cosine, exponential, instantaneous and missing-data episodes
//! - **Failure isolation**: a failing chunk is reported, the others still land
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use euvsim::{CurveKind, DegradationSpec, Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::laser_default()
//!     .with_duration(600.0)
//!     .with_degradation(DegradationSpec::new("Beam_Quality_M2", 0.05, 120.0, CurveKind::Step))
//!     .with_seed(42);
//!
//! let summary = Simulation::new(config)?.run("output")?;
//! println!("{} rows, {} log lines", summary.total_rows, summary.total_logs);
//! # Ok::<(), euvsim::SimError>(())
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Parameter definitions and catalog synthesis
//! - [`timeline`]: Sample timestamps
//! - [`sampler`]: Gaussian noise around baselines
//! - [`schedule`]: Degradation event placement
//! - [`partition`]: Chunking and event clipping
//! - [`degrade`]: Applying degradation curves
//! - [`clamp`]: Value bounds
//! - [`logs`]: Event log rendering
//! - [`executor`]: Per-chunk pipeline and worker pool
//! - [`merge`]: Final dataset/log assembly and event deduplication
//! - [`report`]: Text report and run manifest
//! - [`simulation`]: End-to-end driver

// Modules
pub mod catalog;
pub mod clamp;
pub mod config;
pub mod curve;
pub mod dataset;
pub mod degrade;
pub mod error;
pub mod event;
pub mod executor;
pub mod logs;
pub mod merge;
pub mod partition;
pub mod report;
pub mod sampler;
pub mod schedule;
pub mod simulation;
pub mod timeline;

// Re-exports for convenient access
pub use catalog::{generate_catalog, Catalog, CatalogSpec, Parameter};
pub use config::{DegradationSpec, SimulationConfig, LASER_SECTION};
pub use curve::CurveKind;
pub use dataset::{Column, SampleFrame};
pub use error::{Result, SimError};
pub use event::DegradationEvent;
pub use executor::{ChunkReport, Execution};
pub use logs::PhraseBook;
pub use partition::Chunk;
pub use report::{RunManifest, SimulationReport};
pub use schedule::{Schedule, SpecOutcome};
pub use simulation::{OutputPaths, RunSummary, Simulation, CONFIG_FILE_NAME};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexports_compose() {
        let catalog = Catalog::new()
            .with(Parameter::new("Main_Laser_Power", 1000.0, 0.01))
            .unwrap();
        let config = SimulationConfig::new("m")
            .with_duration(1.0)
            .with_parameters(catalog)
            .with_degradation(DegradationSpec::new(
                "Main_Laser_Power",
                0.1,
                0.5,
                CurveKind::Cosine,
            ));
        assert!(Simulation::new(config).is_ok());
    }
}
