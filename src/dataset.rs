//! In-memory tabular dataset: the unit every operation consumes and produces.

use polars::prelude::*;
use serde::Serialize;

/// Coarse column type used by the validator and for pivot value selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Categorical,
    Numeric,
    Datetime,
    Other,
}

impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_numeric() {
            Self::Numeric
        } else if dtype.is_temporal() {
            Self::Datetime
        } else if dtype.is_string() || matches!(dtype, DataType::Boolean) {
            Self::Categorical
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categorical => "categorical",
            Self::Numeric => "numeric",
            Self::Datetime => "datetime",
            Self::Other => "other",
        }
    }
}

/// Named table. Operations never mutate a dataset; they build new ones.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    frame: DataFrame,
}

/// Per-file overview: shape and number of missing cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub missing: usize,
}

impl Dataset {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Column names in their stored order.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    pub fn dtype(&self, name: &str) -> Option<DataType> {
        self.frame.column(name).ok().map(|c| c.dtype().clone())
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.dtype(name).map(|d| ColumnKind::of(&d))
    }

    pub fn column_kinds(&self) -> Vec<(String, ColumnKind)> {
        self.frame
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), ColumnKind::of(c.dtype())))
            .collect()
    }

    /// Columns eligible as a pivot value column.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.column_kinds()
            .into_iter()
            .filter(|(_, kind)| *kind == ColumnKind::Numeric)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn summary(&self) -> DatasetSummary {
        let missing = self
            .frame
            .get_columns()
            .iter()
            .map(|c| c.null_count())
            .sum();
        DatasetSummary {
            name: self.name.clone(),
            rows: self.height(),
            columns: self.width(),
            missing,
        }
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> DataFrame {
        self.frame.head(Some(n))
    }
}
