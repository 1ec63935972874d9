//! Structured failure kinds for ingestion, validation and combination.
//!
//! Every variant is a recoverable outcome: it aborts the requested operation
//! and leaves held datasets untouched.

use polars::prelude::{DataType, PolarsError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{name}: unsupported file type '{extension}' (expected csv, xls or xlsx)")]
    UnsupportedFormat { name: String, extension: String },

    #[error("{name}: {message}")]
    Parse { name: String, message: String },

    #[error("{name} has {rows} rows, which exceeds the {limit} row limit")]
    TooManyRows {
        name: String,
        rows: usize,
        limit: usize,
    },

    #[error("at most {limit} datasets can be held at once")]
    TooManyFiles { limit: usize },

    #[error("no dataset in slot {slot}")]
    EmptySlot { slot: usize },

    #[error("{name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transfer(#[from] crate::transfer::TransferError),
}

/// Pre-condition failures. Positions are 1-based input positions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{operation} needs at least one dataset")]
    NoInputs { operation: &'static str },

    #[error("column mismatch in file {position}: all files must have identical column names and order")]
    ColumnMismatch {
        position: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("file {position} has {count} join keys; select 1 or 2 join keys per file")]
    KeyCountOutOfRange { position: usize, count: usize },

    #[error("all files must use the same number of join keys (file 1 uses {expected}, file {position} uses {found})")]
    KeyCountMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("join keys were given for {given} files but {inputs} files are loaded")]
    KeyListCount { given: usize, inputs: usize },

    #[error("file {position} has no column '{column}'")]
    MissingColumn { position: usize, column: String },

    #[error("join key type mismatch between '{left}' ({left_dtype}) and '{right}' ({right_dtype}) when joining file {position}")]
    KeyTypeMismatch {
        position: usize,
        left: String,
        right: String,
        left_dtype: DataType,
        right_dtype: DataType,
    },

    #[error("pivot works on exactly one dataset, {found} are loaded")]
    PivotInputCount { found: usize },

    #[error("pivot value column '{column}' is not numeric")]
    NonNumericValue { column: String },

    #[error("pivot index, header and value columns must be three different columns")]
    PivotColumnsOverlap,

    #[error("pivot header column '{column}' contains the value '{index}', which is also the index column name")]
    PivotHeaderClash { column: String, index: String },
}

/// Failure of a requested union, join or pivot.
#[derive(Error, Debug)]
pub enum CombineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("result is too large: {cells} cells exceeds the {limit} cell limit")]
    SizeLimit { cells: usize, limit: usize },

    #[error("{operation} failed: {source}")]
    Polars {
        operation: &'static str,
        #[source]
        source: PolarsError,
    },
}

impl CombineError {
    pub(crate) fn polars(operation: &'static str) -> impl FnOnce(PolarsError) -> Self {
        move |source| Self::Polars { operation, source }
    }
}

/// Non-fatal: the result exceeded the soft cell ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeWarning {
    pub cells: usize,
    pub threshold: usize,
}

impl std::fmt::Display for SizeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "result has {} cells, more than {}; consider simplifying the operation",
            self.cells, self.threshold
        )
    }
}
