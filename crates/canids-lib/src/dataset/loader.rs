//! CSV dataset loading

use super::RawTable;
use crate::error::DatasetError;
use std::path::Path;
use tracing::debug;

/// Read a headered CSV file into a raw table
///
/// Every record must have as many fields as the header row.
pub fn load_csv(path: &Path) -> Result<RawTable, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        return Err(DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: "missing header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    debug!(
        path = %path.display(),
        rows = rows.len(),
        columns = headers.len(),
        "Dataset read"
    );

    Ok(RawTable::new(headers, rows))
}
