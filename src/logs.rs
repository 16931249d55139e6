// EUVSim - Log renderer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Human-readable event log lines for a sampled frame.
//!
//! ```text
//! [2025-01-21 00:08:20] WARNING: Reading of Main_Laser_Power reported. Current value: 925 W
//! ```

use crate::catalog::Catalog;
use crate::dataset::SampleFrame;
use crate::timeline::format_log_timestamp;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Value within normal behaviour.
    Info,
    /// Value attenuated by a degradation.
    Warning,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
        }
    }
}

/// Filler phrases placed before and after the parameter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseBook {
    /// Candidates for the text before the name.
    pub leading: Vec<String>,
    /// Candidates for the text after the name.
    pub trailing: Vec<String>,
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self {
            leading: [
                "Reading of",
                "Sensor update for",
                "Periodic check of",
                "Controller sample of",
                "Telemetry from",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            trailing: [
                "reported.",
                "recorded.",
                "acquired.",
                "within monitoring cycle.",
                "logged by subsystem controller.",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl PhraseBook {
    /// Create a phrase book from explicit lists.
    pub fn new(leading: Vec<String>, trailing: Vec<String>) -> Self {
        Self { leading, trailing }
    }

    /// Book without filler text: lines read `{name} Current value: ...`.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    fn pick<'a, R: Rng + ?Sized>(list: &'a [String], rng: &mut R) -> &'a str {
        list.choose(rng).map(String::as_str).unwrap_or("")
    }
}

/// Format one log line. Empty pieces are dropped without leaving double
/// spaces.
pub fn format_line(
    timestamp: &str,
    level: LogLevel,
    leading: &str,
    name: &str,
    trailing: &str,
    value: f64,
    unit: &str,
) -> String {
    let value = value.to_string();
    let parts = [leading, name, trailing, "Current value:", value.as_str(), unit];
    let body = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{}] {}: {}", timestamp, level, body)
}

/// Render one line per present value, in sample order then column order.
///
/// Two phrases are drawn from `rng` for every line.
pub fn render_logs<R: Rng + ?Sized>(
    frame: &SampleFrame,
    catalog: &Catalog,
    phrases: &PhraseBook,
    rng: &mut R,
) -> Vec<String> {
    let units: Vec<&str> = frame
        .columns
        .iter()
        .map(|c| catalog.get(&c.name).map(|p| p.unit.as_str()).unwrap_or(""))
        .collect();

    let mut lines = Vec::new();
    for (row, ts) in frame.timestamps.iter().enumerate() {
        let stamp = format_log_timestamp(ts);
        for (column, unit) in frame.columns.iter().zip(&units) {
            let Some(value) = column.values[row] else {
                continue;
            };
            let level = if column.degraded[row] {
                LogLevel::Warning
            } else {
                LogLevel::Info
            };
            let leading = PhraseBook::pick(&phrases.leading, rng);
            let trailing = PhraseBook::pick(&phrases.trailing, rng);
            lines.push(format_line(
                &stamp,
                level,
                leading,
                &column.name,
                trailing,
                value,
                unit,
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Parameter;
    use crate::dataset::Column;
    use chrono::{Duration, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        Catalog::new()
            .with(Parameter::new("Main_Laser_Power", 1000.0, 0.01).with_unit("W"))
            .unwrap()
            .with(Parameter::new("Laser_Wavelength", 13.5, 0.001).with_unit("nm"))
            .unwrap()
    }

    fn frame() -> SampleFrame {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 21, 0, 8, 20).unwrap();
        let mut frame = SampleFrame::new(vec![t0, t0 + Duration::seconds(1)]);
        let mut power = Column::new("Main_Laser_Power", vec![Some(925.0), Some(999.5)]);
        power.degraded[0] = true;
        frame.push_column(power).unwrap();
        frame
            .push_column(Column::new("Laser_Wavelength", vec![None, Some(13.51)]))
            .unwrap();
        frame
    }

    #[test]
    fn test_format_line_collapses_empty_phrases() {
        let line = format_line("2025-01-21 00:00:00", LogLevel::Info, "", "p", "", 1.5, "units");
        assert_eq!(line, "[2025-01-21 00:00:00] INFO: p Current value: 1.5 units");
    }

    #[test]
    fn test_render_empty_book() {
        let mut rng = StdRng::seed_from_u64(0);
        let lines = render_logs(&frame(), &catalog(), &PhraseBook::empty(), &mut rng);
        assert_eq!(
            lines,
            vec![
                "[2025-01-21 00:08:20] WARNING: Main_Laser_Power Current value: 925 W",
                "[2025-01-21 00:08:21] INFO: Main_Laser_Power Current value: 999.5 W",
                "[2025-01-21 00:08:21] INFO: Laser_Wavelength Current value: 13.51 nm",
            ]
        );
    }

    #[test]
    fn test_render_with_phrases() {
        let book = PhraseBook::default();
        let mut rng = StdRng::seed_from_u64(4);
        let lines = render_logs(&frame(), &catalog(), &book, &mut rng);
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert!(!line.contains("  "));
            assert!(book.leading.iter().any(|p| line.contains(p.as_str())));
            assert!(book.trailing.iter().any(|p| line.contains(p.as_str())));
        }
        assert!(lines[0].contains("WARNING: "));
    }

    #[test]
    fn test_render_deterministic() {
        let book = PhraseBook::default();
        let a = render_logs(&frame(), &catalog(), &book, &mut StdRng::seed_from_u64(9));
        let b = render_logs(&frame(), &catalog(), &book, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
