use polars::prelude::*;
use tracing::debug;

use super::{result_name, Combined, OperationKind, Provenance};
use crate::dataset::Dataset;
use crate::error::CombineError;
use crate::validate;

/// Row-wise concatenation in input order. Fails as a whole on any column
/// sequence mismatch; differing dtypes under the same name are widened to
/// their common supertype.
pub fn union(inputs: &[Dataset]) -> Result<Combined, CombineError> {
    validate::check_union(inputs)?;

    let lazy_frames: Vec<LazyFrame> = inputs.iter().map(|d| d.frame().clone().lazy()).collect();
    let args = UnionArgs {
        to_supertypes: true,
        ..Default::default()
    };
    let frame = concat(lazy_frames.as_slice(), args)
        .and_then(|lf| lf.collect())
        .map_err(CombineError::polars("union"))?;

    debug!(inputs = inputs.len(), rows = frame.height(), "union complete");

    Ok(Combined {
        dataset: Dataset::new(result_name(OperationKind::Union), frame),
        provenance: Provenance::new(OperationKind::Union, inputs),
        warning: None,
    })
}
