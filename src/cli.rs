//! Conversions from command-line arguments to core types.

use std::path::PathBuf;

use color_eyre::eyre::eyre;
use color_eyre::Result;

pub use datablend_cli::{
    AggregationArg, Args, CompressionFormat, ExportFormatArg, FileFormat, JoinHowArg, OperationArg,
};

use crate::combine::{Aggregation, JoinHow, JoinSpec, Operation, PivotSpec};
use crate::export::ExportFormat;
use crate::ingest::ReadOptions;

const TOKEN_PREFIX: &str = "token:";

/// One positional input: a file on disk or a transfer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Path(PathBuf),
    Token(String),
}

impl Input {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(TOKEN_PREFIX) {
            Some(token) => Self::Token(token.trim().to_string()),
            None => Self::Path(PathBuf::from(raw)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Token(t) => format!("{}{}", TOKEN_PREFIX, t),
        }
    }
}

impl From<JoinHowArg> for JoinHow {
    fn from(arg: JoinHowArg) -> Self {
        match arg {
            JoinHowArg::Inner => Self::Inner,
            JoinHowArg::Left => Self::Left,
            JoinHowArg::Right => Self::Right,
            JoinHowArg::Outer => Self::Outer,
        }
    }
}

impl From<AggregationArg> for Aggregation {
    fn from(arg: AggregationArg) -> Self {
        match arg {
            AggregationArg::Sum => Self::Sum,
            AggregationArg::Mean => Self::Mean,
            AggregationArg::Count => Self::Count,
            AggregationArg::Min => Self::Min,
            AggregationArg::Max => Self::Max,
        }
    }
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Csv => Self::Csv,
            ExportFormatArg::Parquet => Self::Parquet,
            ExportFormatArg::Json => Self::Json,
            ExportFormatArg::Ndjson => Self::Ndjson,
        }
    }
}

/// The requested operation, or `None` when only summaries were asked for.
pub fn operation_from_args(args: &Args) -> Result<Option<Operation>> {
    let Some(op) = args.operation else {
        return Ok(None);
    };
    let operation = match op {
        OperationArg::Union => Operation::Union,
        OperationArg::Join => Operation::Join(JoinSpec {
            how: args.how.into(),
            keys: args.key_lists(),
        }),
        OperationArg::Pivot => {
            let required = |value: &Option<String>, flag: &str| {
                value
                    .clone()
                    .ok_or_else(|| eyre!("pivot requires --{}", flag))
            };
            Operation::Pivot(PivotSpec {
                index: required(&args.index, "index")?,
                columns: required(&args.columns, "columns")?,
                values: required(&args.values, "values")?,
                aggregation: args.agg.into(),
            })
        }
    };
    Ok(Some(operation))
}

/// Apply CLI read flags on top of the configured options.
pub fn read_options_from_args(args: &Args, mut options: ReadOptions) -> ReadOptions {
    if let Some(delimiter) = args.delimiter {
        options.delimiter = delimiter;
    }
    if let Some(no_header) = args.no_header {
        options.has_header = !no_header;
    }
    if let Some(parse_dates) = args.parse_dates {
        options.try_parse_dates = parse_dates;
    }
    if args.excel_sheet.is_some() {
        options.excel_sheet = args.excel_sheet.clone();
    }
    options
}
