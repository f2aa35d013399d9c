// src/tables.rs - Whitespace-delimited numeric input tables and monotone
// linear interpolation over (x, value) pairs.

use crate::error::SimulationError;
use crate::math_utils::lerp;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Read a whitespace/tab-delimited numeric table, one row per line. Blank
/// lines are skipped; any non-numeric token is a configuration error.
pub fn read_numeric_table<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>, SimulationError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        SimulationError::config(format!("failed to read table {}: {e}", path.display()))
    })?;

    let mut rows = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    SimulationError::config(format!(
                        "{}:{}: '{token}' is not a number",
                        path.display(),
                        line_number + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read the depth-coordinate file: rows of at least three columns, of which
/// only the third (the depth in metres) is used.
pub fn read_depth_coordinates<P: AsRef<Path>>(path: P) -> Result<Vec<f64>, SimulationError> {
    let path = path.as_ref();
    let rows = read_numeric_table(path)?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            row.get(2).copied().ok_or_else(|| {
                SimulationError::config(format!(
                    "{}: row {} has {} columns, expected at least 3",
                    path.display(),
                    i + 1,
                    row.len()
                ))
            })
        })
        .collect()
}

/// Ordered (x, value) pairs queried by linear interpolation.
///
/// Immutable after load. Queries outside the tabulated range are errors;
/// extrapolation is not defined behaviour. A query exactly at a sample point
/// returns that sample's value.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationTable {
    samples: Vec<(f64, f64)>,
}

impl InterpolationTable {
    pub fn new(samples: Vec<(f64, f64)>) -> Result<Self, SimulationError> {
        if samples.len() < 2 {
            return Err(SimulationError::config(format!(
                "interpolation table needs at least 2 samples, got {}",
                samples.len()
            )));
        }
        for window in samples.windows(2) {
            if window[1].0 <= window[0].0 {
                return Err(SimulationError::config(format!(
                    "interpolation table x-values must be strictly increasing \
                     ({} followed by {})",
                    window[0].0, window[1].0
                )));
            }
        }
        Ok(InterpolationTable { samples })
    }

    /// Build from table rows, taking `x_col` and `y_col` of each row.
    pub fn from_rows(
        rows: &[Vec<f64>],
        x_col: usize,
        y_col: usize,
    ) -> Result<Self, SimulationError> {
        let samples = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let x = row.get(x_col).copied();
                let y = row.get(y_col).copied();
                match (x, y) {
                    (Some(x), Some(y)) => Ok((x, y)),
                    _ => Err(SimulationError::config(format!(
                        "table row {} has {} columns, expected at least {}",
                        i + 1,
                        row.len(),
                        x_col.max(y_col) + 1
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(samples)
    }

    pub fn from_file<P: AsRef<Path>>(
        path: P,
        x_col: usize,
        y_col: usize,
    ) -> Result<Self, SimulationError> {
        let rows = read_numeric_table(path)?;
        Self::from_rows(&rows, x_col, y_col)
    }

    pub fn min_x(&self) -> f64 {
        self.samples[0].0
    }

    pub fn max_x(&self) -> f64 {
        self.samples[self.samples.len() - 1].0
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Linear interpolation between the bracketing samples.
    pub fn interpolate(&self, x: f64) -> Result<f64, SimulationError> {
        if x < self.min_x() || x > self.max_x() {
            return Err(SimulationError::config(format!(
                "interpolation query {x} outside table range [{}, {}]",
                self.min_x(),
                self.max_x()
            )));
        }
        let upper = self.samples.partition_point(|&(sx, _)| sx < x);
        if upper == 0 {
            return Ok(self.samples[0].1);
        }
        let (x0, y0) = self.samples[upper - 1];
        let (x1, y1) = self.samples[upper];
        if x == x0 {
            return Ok(y0);
        }
        Ok(lerp(y0, y1, (x - x0) / (x1 - x0)))
    }

    /// Write the table back out tab-delimited, one sample per row.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SimulationError> {
        let mut file = fs::File::create(path.as_ref())?;
        for (x, y) in &self.samples {
            writeln!(file, "{x}\t{y}")?;
        }
        Ok(())
    }
}
