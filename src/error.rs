// EUVSim - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for EUVSim
//!
//! Scheduling rejections are not errors: they only reduce the number of
//! placed events and are reported through [`crate::schedule::SpecOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Main error type for simulation operations
#[derive(Error, Debug)]
pub enum SimError {
    /// Malformed or unreachable configuration. Raised before any chunk work.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Unable to read or write an intermediate or final file
    #[error("Persistence error on {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding/decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Noise distribution could not be built
    #[error("Sampling error for {parameter}: {reason}")]
    Sampling { parameter: String, reason: String },

    /// Timestamp could not be parsed or represented
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// A chunk pipeline panicked
    #[error("Chunk {index} panicked: {message}")]
    ChunkPanic { index: usize, message: String },
}

impl SimError {
    /// Build a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Config(msg.into())
    }

    /// Wrap an IO error with the path it happened on.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// True when the error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, SimError::Config(_))
    }
}
