//! Union, join and pivot over held datasets.
//!
//! Each operation is a pure function from input datasets to a new
//! [`Combined`] result. Validation runs before any data is touched, except
//! join key dtypes, which are checked at every pairwise step.

mod join;
mod pivot;
mod union;

pub use join::join;
pub use pivot::pivot;
pub use union::union;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{CombineError, SizeWarning};
use crate::guardrail::Limits;

/// Join type applied at every pairwise merge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinHow {
    pub const ALL: [Self; 4] = [Self::Inner, Self::Left, Self::Right, Self::Outer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
        }
    }
}

/// Aggregation for the pivot value column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

impl Aggregation {
    pub const ALL: [Self; 5] = [Self::Sum, Self::Mean, Self::Count, Self::Min, Self::Max];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Keys for a sequential join: one list of 1 or 2 column names per input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub how: JoinHow,
    pub keys: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotSpec {
    pub index: String,
    pub columns: String,
    pub values: String,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Union,
    Join(JoinSpec),
    Pivot(PivotSpec),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Union => OperationKind::Union,
            Self::Join(_) => OperationKind::Join,
            Self::Pivot(_) => OperationKind::Pivot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Union,
    Join,
    Pivot,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::Join => "join",
            Self::Pivot => "pivot",
        }
    }
}

/// Rows of the intermediate result kept with each join step.
pub const STEP_PREVIEW_ROWS: usize = 5;

/// One pairwise merge of a join.
#[derive(Debug, Clone)]
pub struct JoinStep {
    /// 1-based position of the input merged in this step.
    pub position: usize,
    pub left_keys: Vec<String>,
    pub right_keys: Vec<String>,
    pub rows: usize,
    pub columns: usize,
    /// First [`STEP_PREVIEW_ROWS`] rows after this merge.
    pub preview: DataFrame,
}

/// Where a result came from. Display only.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub operation: OperationKind,
    pub inputs: Vec<String>,
    pub steps: Vec<JoinStep>,
}

impl Provenance {
    fn new(operation: OperationKind, inputs: &[Dataset]) -> Self {
        Self {
            operation,
            inputs: inputs.iter().map(|d| d.name().to_string()).collect(),
            steps: Vec::new(),
        }
    }
}

/// Result of a successful operation.
#[derive(Debug, Clone)]
pub struct Combined {
    pub dataset: Dataset,
    pub provenance: Provenance,
    pub warning: Option<SizeWarning>,
}

/// Run `operation` over `inputs`, in input order.
pub fn execute(
    operation: &Operation,
    inputs: &[Dataset],
    limits: &Limits,
) -> Result<Combined, CombineError> {
    match operation {
        Operation::Union => union(inputs),
        Operation::Join(spec) => join(inputs, spec),
        Operation::Pivot(spec) => pivot(inputs, spec, limits),
    }
}

fn result_name(kind: OperationKind) -> String {
    format!("{}_result", kind.as_str())
}
