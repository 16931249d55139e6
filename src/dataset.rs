// EUVSim - Sample frames
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Column-oriented sample storage and CSV I/O.
//!
//! A [`SampleFrame`] holds one chunk's timestamps and, per parameter, the
//! sampled values (`None` = missing) and degraded flags.

use crate::error::{Result, SimError};
use crate::timeline::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Name of the time column in every CSV file.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Values and flags of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Parameter name.
    pub name: String,
    /// One value per timestamp; `None` = missing.
    pub values: Vec<Option<f64>>,
    /// One flag per timestamp; true while a degradation attenuates the value.
    pub degraded: Vec<bool>,
}

impl Column {
    /// Create a column from values, all flags cleared.
    pub fn new(name: &str, values: Vec<Option<f64>>) -> Self {
        let degraded = vec![false; values.len()];
        Self {
            name: name.to_string(),
            values,
            degraded,
        }
    }
}

/// A block of samples in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleFrame {
    /// Sample times, ascending.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Columns, in catalog order.
    pub columns: Vec<Column>,
}

impl SampleFrame {
    /// Create a frame with the given timestamps and no columns.
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            timestamps,
            columns: Vec::new(),
        }
    }

    /// Append a column. Its length must match the number of timestamps.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.values.len() != self.timestamps.len() {
            return Err(SimError::config(format!(
                "column {} has {} values for {} timestamps",
                column.name,
                column.values.len(),
                self.timestamps.len()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Write `Timestamp` plus one column per parameter. Missing values are
    /// written as empty fields.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(TIMESTAMP_COLUMN.to_string());
        header.extend(self.column_names());
        writer.write_record(&header)?;

        let mut record = Vec::with_capacity(header.len());
        for (row, ts) in self.timestamps.iter().enumerate() {
            record.clear();
            record.push(format_timestamp(ts));
            for column in &self.columns {
                record.push(match column.values[row] {
                    Some(v) => v.to_string(),
                    None => String::new(),
                });
            }
            writer.write_record(&record)?;
        }

        writer.flush().map_err(|e| SimError::persistence(path, e))?;
        Ok(())
    }

    /// Read a dataset written by [`SampleFrame::write_csv`]. Flags are not
    /// persisted and come back cleared.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.get(0) != Some(TIMESTAMP_COLUMN) {
            return Err(SimError::config(format!(
                "first column must be '{}'",
                TIMESTAMP_COLUMN
            )));
        }

        let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut timestamps = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let raw = record.get(0).unwrap_or_default();
            let ts = parse_timestamp(raw).ok_or_else(|| {
                SimError::Timestamp(format!("line {}: invalid timestamp '{}'", line + 2, raw))
            })?;
            timestamps.push(ts);

            for (i, column) in values.iter_mut().enumerate() {
                let field = record.get(i + 1).map(str::trim).unwrap_or_default();
                let value = if field.is_empty() {
                    None
                } else {
                    Some(field.parse::<f64>().map_err(|_| {
                        SimError::config(format!(
                            "line {}: invalid value for {}",
                            line + 2,
                            names[i]
                        ))
                    })?)
                };
                column.push(value);
            }
        }

        let mut frame = SampleFrame::new(timestamps);
        for (name, column) in names.iter().zip(values) {
            frame.push_column(Column::new(name, column))?;
        }
        Ok(frame)
    }
}
