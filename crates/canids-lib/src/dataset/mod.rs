//! Feature datasets
//!
//! This module provides:
//! - Raw tabular data loaded from CSV files
//! - The stateless preprocessing transform into numeric features
//! - The category catalog mapping client keys to dataset files

mod catalog;
mod loader;
mod preprocess;

pub use catalog::{DatasetCatalog, DEFAULT_DATASETS};
pub use loader::load_csv;
pub use preprocess::{Preprocessor, DEFAULT_TIMESTAMP_COLUMN};

/// Untyped table as read from disk: named columns, string cells
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from string slices, mostly useful for fixtures
    pub fn from_str_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cells of one column in row order. Short rows yield empty cells.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }
}

/// Preprocessed, all-numeric dataset stored row-major
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    columns: Vec<String>,
    values: Vec<f32>,
    rows: usize,
}

impl FeatureTable {
    /// `values` must hold exactly `rows * columns.len()` entries
    pub fn new(columns: Vec<String>, values: Vec<f32>, rows: usize) -> Self {
        debug_assert_eq!(values.len(), rows * columns.len());
        Self {
            columns,
            values,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let width = self.column_count();
        Some(&self.values[index * width..(index + 1) * width])
    }

    /// All values of one column in row order
    pub fn column_values(&self, index: usize) -> Vec<f32> {
        let width = self.column_count();
        if index >= width {
            return Vec::new();
        }
        self.values.iter().skip(index).step_by(width).copied().collect()
    }

    /// Contiguous block of `len` rows starting at `start`, if fully in range
    pub fn batch(&self, start: usize, len: usize) -> Option<BatchView<'_>> {
        let end = start.checked_add(len)?;
        if len == 0 || end > self.rows {
            return None;
        }
        let width = self.column_count();
        Some(BatchView {
            values: &self.values[start * width..end * width],
            rows: len,
            cols: width,
        })
    }
}

/// Borrowed row-major slice of a feature table, fed to the classifier
#[derive(Debug, Clone, Copy)]
pub struct BatchView<'a> {
    values: &'a [f32],
    rows: usize,
    cols: usize,
}

impl<'a> BatchView<'a> {
    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> Option<&'a [f32]> {
        if index >= self.rows {
            return None;
        }
        Some(&self.values[index * self.cols..(index + 1) * self.cols])
    }
}
