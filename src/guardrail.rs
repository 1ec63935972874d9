//! Row and cell ceilings that bound memory use and rendering cost.

use crate::error::{CombineError, IngestError, SizeWarning};

pub const DEFAULT_MAX_FILES: usize = 5;
pub const DEFAULT_MAX_ROWS: usize = 75_000;
pub const DEFAULT_WARN_CELLS: usize = 75_000;
pub const DEFAULT_MAX_CELLS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Datasets held at once.
    pub max_files: usize,
    /// Rows accepted per ingested dataset.
    pub max_rows: usize,
    /// Result cells above which the caller is warned.
    pub warn_cells: usize,
    /// Result cells above which the operation fails.
    pub max_cells: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_rows: DEFAULT_MAX_ROWS,
            warn_cells: DEFAULT_WARN_CELLS,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

pub fn check_rows(name: &str, rows: usize, limits: &Limits) -> Result<(), IngestError> {
    if rows > limits.max_rows {
        return Err(IngestError::TooManyRows {
            name: name.to_string(),
            rows,
            limit: limits.max_rows,
        });
    }
    Ok(())
}

pub fn check_capacity(held: usize, limits: &Limits) -> Result<(), IngestError> {
    if held >= limits.max_files {
        return Err(IngestError::TooManyFiles {
            limit: limits.max_files,
        });
    }
    Ok(())
}

/// Cell check for a `rows` x `columns` result. Saturates instead of overflowing.
pub fn check_cells(
    rows: usize,
    columns: usize,
    limits: &Limits,
) -> Result<Option<SizeWarning>, CombineError> {
    let cells = rows.saturating_mul(columns);
    if cells > limits.max_cells {
        return Err(CombineError::SizeLimit {
            cells,
            limit: limits.max_cells,
        });
    }
    if cells > limits.warn_cells {
        return Ok(Some(SizeWarning {
            cells,
            threshold: limits.warn_cells,
        }));
    }
    Ok(None)
}
