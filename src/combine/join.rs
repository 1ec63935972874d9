//! Sequential, left-associative join.
//!
//! The accumulated result starts as input 1 and is merged with each later
//! input in turn. Matching always uses input 1's key names against the next
//! input's keys; accumulated columns are never renamed, and colliding columns
//! from the new input get a `_file{n}` suffix.

use std::collections::HashSet;

use polars::prelude::*;
use tracing::{debug, info};

use super::{
    result_name, Combined, JoinHow, JoinSpec, JoinStep, OperationKind, Provenance,
    STEP_PREVIEW_ROWS,
};
use crate::dataset::Dataset;
use crate::error::CombineError;
use crate::validate;

impl From<JoinHow> for JoinType {
    fn from(how: JoinHow) -> Self {
        match how {
            JoinHow::Inner => JoinType::Inner,
            JoinHow::Left => JoinType::Left,
            JoinHow::Right => JoinType::Right,
            JoinHow::Outer => JoinType::Full,
        }
    }
}

fn maintain_order(how: JoinHow) -> MaintainOrderJoin {
    match how {
        JoinHow::Right => MaintainOrderJoin::RightLeft,
        JoinHow::Inner | JoinHow::Left | JoinHow::Outer => MaintainOrderJoin::LeftRight,
    }
}

fn key_alias(idx: usize) -> String {
    format!("__datablend_key_{idx}")
}

/// Suffix appended to colliding columns of the input at 1-based `position`.
pub(crate) fn collision_suffix(position: usize) -> String {
    format!("_file{position}")
}

/// Join every input in order. All-or-nothing: a key dtype mismatch at any
/// step discards the steps already merged.
pub fn join(inputs: &[Dataset], spec: &JoinSpec) -> Result<Combined, CombineError> {
    validate::check_join_keys(inputs, &spec.keys)?;

    let left_keys = &spec.keys[0];
    let mut provenance = Provenance::new(OperationKind::Join, inputs);
    let mut acc = inputs[0].frame().clone();

    for (idx, (right, right_keys)) in inputs.iter().zip(&spec.keys).enumerate().skip(1) {
        let position = idx + 1;
        validate::check_key_types(position, &acc, left_keys, right, right_keys)?;

        acc = merge_step(acc, right.frame(), left_keys, right_keys, spec.how, position)?;

        info!(
            position,
            how = spec.how.as_str(),
            left_keys = ?left_keys,
            right_keys = ?right_keys,
            rows = acc.height(),
            "joined {}",
            right.name()
        );
        provenance.steps.push(JoinStep {
            position,
            left_keys: left_keys.clone(),
            right_keys: right_keys.clone(),
            rows: acc.height(),
            columns: acc.width(),
            preview: acc.head(Some(STEP_PREVIEW_ROWS)),
        });
    }

    Ok(Combined {
        dataset: Dataset::new(result_name(OperationKind::Join), acc),
        provenance,
        warning: None,
    })
}

/// One pairwise merge, pandas `merge(left_on, right_on)` style:
/// same-named key pairs collapse into the left column, differently named
/// key pairs keep both columns.
fn merge_step(
    left: DataFrame,
    right: &DataFrame,
    left_keys: &[String],
    right_keys: &[String],
    how: JoinHow,
    position: usize,
) -> Result<DataFrame, CombineError> {
    let suffix = collision_suffix(position);
    let left_names: Vec<String> = left
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let taken: HashSet<&str> = left_names.iter().map(String::as_str).collect();
    let output_name = |name: &str| {
        if taken.contains(name) {
            format!("{name}{suffix}")
        } else {
            name.to_string()
        }
    };
    let shared_key = |i: usize| left_keys[i] == right_keys[i];

    // Right side: keys copied under private aliases, other columns renamed
    // up front so the join itself never has to resolve a name clash.
    let mut right_projection: Vec<Expr> = right_keys
        .iter()
        .enumerate()
        .map(|(i, rk)| col(rk.as_str()).alias(key_alias(i)))
        .collect();
    let mut right_output: Vec<Expr> = Vec::new();
    for name in right.get_column_names() {
        let name = name.as_str();
        let key_pairs: Vec<usize> = (0..right_keys.len())
            .filter(|&i| right_keys[i] == name)
            .collect();
        if key_pairs.is_empty() {
            let renamed = output_name(name);
            right_projection.push(col(name).alias(renamed.as_str()));
            right_output.push(col(renamed.as_str()));
        } else {
            for i in key_pairs.into_iter().filter(|&i| !shared_key(i)) {
                right_output.push(col(key_alias(i)).alias(output_name(name).as_str()));
            }
        }
    }

    let left_on: Vec<Expr> = left_keys.iter().map(|k| col(k.as_str())).collect();
    let right_on: Vec<Expr> = (0..right_keys.len()).map(|i| col(key_alias(i))).collect();

    let mut output: Vec<Expr> = left_names
        .iter()
        .map(|name| {
            match (0..left_keys.len()).find(|&i| shared_key(i) && left_keys[i] == *name) {
                Some(i) => coalesce(&[col(name.as_str()), col(key_alias(i))]).alias(name.as_str()),
                None => col(name.as_str()),
            }
        })
        .collect();
    output.extend(right_output);

    debug!(position, how = how.as_str(), "merging");

    let mut args = JoinArgs::new(how.into())
        .with_suffix(Some(suffix.as_str().into()))
        .with_coalesce(JoinCoalesce::KeepColumns);
    args.maintain_order = maintain_order(how);
    // Null keys match each other.
    args.nulls_equal = true;

    left.lazy()
        .join(
            right.clone().lazy().select(right_projection),
            left_on,
            right_on,
            args,
        )
        .select(output)
        .collect()
        .map_err(CombineError::polars("join"))
}
