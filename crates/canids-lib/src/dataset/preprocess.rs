//! Stateless preprocessing of raw tables into classifier features
//!
//! Applied once per session:
//! 1. Drop the timestamp column if present
//! 2. Encode non-numeric columns to integer codes in first-seen order
//! 3. Standard-scale every column using the population standard deviation
//!
//! Columns with zero variance are centred only (σ treated as 1), so they
//! come out as all zeros instead of NaN.

use super::{FeatureTable, RawTable};
use crate::error::PreprocessError;
use std::collections::HashMap;

/// Name of the column dropped before encoding
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "Timestamp";

/// Scales below this are treated as zero variance
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Preprocessing transform. Holds no state between invocations.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    timestamp_column: String,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_COLUMN)
    }
}

impl Preprocessor {
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
        }
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Produce a numeric feature table. The input table is left untouched.
    pub fn preprocess(&self, table: &RawTable) -> Result<FeatureTable, PreprocessError> {
        let kept: Vec<(usize, &String)> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() != self.timestamp_column)
            .collect();

        if kept.is_empty() {
            return Err(PreprocessError::NoColumns);
        }

        let mut columns = Vec::with_capacity(kept.len());
        for (index, name) in &kept {
            let mut values = encode_column(name, table.column(*index))?;
            standard_scale(&mut values);
            columns.push(values);
        }

        let rows = table.row_count();
        let mut values = Vec::with_capacity(rows * columns.len());
        for row in 0..rows {
            for column in &columns {
                values.push(column[row] as f32);
            }
        }

        let names = kept.into_iter().map(|(_, name)| name.clone()).collect();
        Ok(FeatureTable::new(names, values, rows))
    }
}

/// Parse a column as numbers, or fall back to categorical codes when any
/// non-empty cell is not a number
fn encode_column<'a>(
    name: &str,
    cells: impl Iterator<Item = &'a str>,
) -> Result<Vec<f64>, PreprocessError> {
    let cells: Vec<&str> = cells.collect();

    let is_numeric = cells.iter().any(|c| !c.is_empty())
        && cells
            .iter()
            .filter(|c| !c.is_empty())
            .all(|c| c.parse::<f64>().is_ok());

    if !is_numeric {
        return Ok(encode_categorical(&cells));
    }

    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            if cell.is_empty() {
                return Err(PreprocessError::MissingValue {
                    column: name.to_string(),
                    row,
                });
            }
            match cell.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(PreprocessError::NonFinite {
                    column: name.to_string(),
                    row,
                }),
            }
        })
        .collect()
}

fn encode_categorical(cells: &[&str]) -> Vec<f64> {
    let mut codes: HashMap<&str, usize> = HashMap::new();
    cells
        .iter()
        .map(|cell| {
            let next = codes.len();
            *codes.entry(*cell).or_insert(next) as f64
        })
        .collect()
}

fn standard_scale(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let scale = if std_dev < MIN_SCALE { 1.0 } else { std_dev };

    for value in values.iter_mut() {
        *value = (*value - mean) / scale;
    }
}
