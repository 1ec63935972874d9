//! Pre-condition checks for union, join and pivot. Nothing here mutates input.

use polars::prelude::DataFrame;

use crate::combine::PivotSpec;
use crate::dataset::{ColumnKind, Dataset};
use crate::error::ValidationError;

pub const MIN_JOIN_KEYS: usize = 1;
pub const MAX_JOIN_KEYS: usize = 2;

/// All inputs must share the first input's column sequence exactly (names and order).
pub fn check_union(inputs: &[Dataset]) -> Result<(), ValidationError> {
    let first = inputs
        .first()
        .ok_or(ValidationError::NoInputs { operation: "union" })?;
    let expected = first.column_names();
    for (idx, ds) in inputs.iter().enumerate() {
        let found = ds.column_names();
        if found != expected {
            return Err(ValidationError::ColumnMismatch {
                position: idx + 1,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Checks done before any merging starts: one key list per input, 1 or 2 keys
/// each, the same count everywhere, and every key present in its dataset.
/// Key dtypes are checked per step by [`check_key_types`].
pub fn check_join_keys(inputs: &[Dataset], keys: &[Vec<String>]) -> Result<(), ValidationError> {
    if inputs.is_empty() {
        return Err(ValidationError::NoInputs { operation: "join" });
    }
    if keys.len() != inputs.len() {
        return Err(ValidationError::KeyListCount {
            given: keys.len(),
            inputs: inputs.len(),
        });
    }
    for (idx, k) in keys.iter().enumerate() {
        if !(MIN_JOIN_KEYS..=MAX_JOIN_KEYS).contains(&k.len()) {
            return Err(ValidationError::KeyCountOutOfRange {
                position: idx + 1,
                count: k.len(),
            });
        }
    }
    let expected = keys[0].len();
    if let Some((idx, k)) = keys.iter().enumerate().find(|(_, k)| k.len() != expected) {
        return Err(ValidationError::KeyCountMismatch {
            position: idx + 1,
            expected,
            found: k.len(),
        });
    }
    for (idx, (ds, k)) in inputs.iter().zip(keys).enumerate() {
        if let Some(column) = k.iter().find(|c| !ds.has_column(c)) {
            return Err(ValidationError::MissingColumn {
                position: idx + 1,
                column: column.clone(),
            });
        }
    }
    Ok(())
}

/// Key dtypes of the accumulated result must equal those of the next input.
/// `position` is the 1-based position of `right` among the join inputs.
pub fn check_key_types(
    position: usize,
    left: &DataFrame,
    left_keys: &[String],
    right: &Dataset,
    right_keys: &[String],
) -> Result<(), ValidationError> {
    for (lk, rk) in left_keys.iter().zip(right_keys) {
        let left_dtype = left
            .column(lk)
            .map_err(|_| ValidationError::MissingColumn {
                position: 1,
                column: lk.clone(),
            })?
            .dtype()
            .clone();
        let right_dtype = right
            .dtype(rk)
            .ok_or_else(|| ValidationError::MissingColumn {
                position,
                column: rk.clone(),
            })?;
        if left_dtype != right_dtype {
            return Err(ValidationError::KeyTypeMismatch {
                position,
                left: lk.clone(),
                right: rk.clone(),
                left_dtype,
                right_dtype,
            });
        }
    }
    Ok(())
}

/// Pivot takes exactly one input; index, header and value must be distinct
/// existing columns, and the value column must be numeric.
pub fn check_pivot(inputs: &[Dataset], spec: &PivotSpec) -> Result<(), ValidationError> {
    let ds = match inputs {
        [] => return Err(ValidationError::NoInputs { operation: "pivot" }),
        [ds] => ds,
        _ => {
            return Err(ValidationError::PivotInputCount {
                found: inputs.len(),
            })
        }
    };
    for column in [&spec.index, &spec.columns, &spec.values] {
        if !ds.has_column(column) {
            return Err(ValidationError::MissingColumn {
                position: 1,
                column: column.clone(),
            });
        }
    }
    if spec.index == spec.columns || spec.index == spec.values || spec.columns == spec.values {
        return Err(ValidationError::PivotColumnsOverlap);
    }
    if ds.column_kind(&spec.values) != Some(ColumnKind::Numeric) {
        return Err(ValidationError::NonNumericValue {
            column: spec.values.clone(),
        });
    }
    Ok(())
}
