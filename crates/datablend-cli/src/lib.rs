//! Shared CLI definitions for datablend.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Input file format. Detected from the extension unless forced with `--format`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Excel (.xls, .xlsx, .xlsm, .xlsb)
    Excel,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "xlsx").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xls" | "xlsx" | "xlsm" | "xlsb" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Canonical extension handed to the ingestion layer.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }
}

/// Compression format for exported files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            match ext.to_lowercase().as_str() {
                "gz" => Some(Self::Gzip),
                "zst" | "zstd" => Some(Self::Zstd),
                "bz2" | "bz" => Some(Self::Bzip2),
                "xz" => Some(Self::Xz),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// Reshaping operation to run over the inputs.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OperationArg {
    /// Stack inputs vertically (identical column names and order required)
    Union,
    /// Merge inputs left to right on their --keys
    Join,
    /// Reshape a single input into an index x header grid
    Pivot,
}

/// Join type applied at every pairwise merge.
#[derive(Debug, Default, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum JoinHowArg {
    /// Keep rows whose keys exist on both sides
    #[default]
    Inner,
    /// Keep every row of the accumulated result
    Left,
    /// Keep every row of the input being merged
    Right,
    /// Keep every row from both sides
    Outer,
}

/// Aggregation applied to the pivot value column.
#[derive(Debug, Default, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AggregationArg {
    #[default]
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

/// Format for `--output`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportFormatArg {
    Csv,
    Parquet,
    Json,
    Ndjson,
}

/// Command-line arguments for datablend
#[derive(Clone, Parser, Debug)]
#[command(
    name = "datablend",
    version,
    about = "Combine tabular datasets by union, join, or pivot",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Input files (csv, xls, xlsx) or transfer tokens written as token:<TOKEN>, in combination order
    #[arg(required_unless_present = "generate_config", num_args = 1.., value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Operation to run. Without it, a summary of each input is printed
    #[arg(long = "operation", short = 'x', value_enum)]
    pub operation: Option<OperationArg>,

    /// Join type used at every step of a join
    #[arg(long = "how", value_enum, default_value_t = JoinHowArg::Inner)]
    pub how: JoinHowArg,

    /// Join key(s) for one input, comma-separated (1 or 2 names). Give once per input, in input order
    #[arg(long = "keys", value_name = "KEYS")]
    pub keys: Vec<String>,

    /// Pivot index column (row labels)
    #[arg(long = "index", value_name = "COLUMN")]
    pub index: Option<String>,

    /// Pivot header column (one result column per distinct value)
    #[arg(long = "columns", value_name = "COLUMN")]
    pub columns: Option<String>,

    /// Pivot value column (must be numeric)
    #[arg(long = "values", value_name = "COLUMN")]
    pub values: Option<String>,

    /// Pivot aggregation function
    #[arg(long = "agg", value_enum, default_value_t = AggregationArg::Sum)]
    pub agg: AggregationArg,

    /// Write the result to this file
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Force the export format. By default it is inferred from the --output extension
    #[arg(long = "export-format", value_enum)]
    pub export_format: Option<ExportFormatArg>,

    /// Compress the exported file (csv, json and ndjson only)
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Publish the result to the transfer store and print its token
    #[arg(long = "publish", action)]
    pub publish: bool,

    /// Source application label recorded with a published result
    #[arg(long = "source-app", value_name = "NAME")]
    pub source_app: Option<String>,

    /// Force input file format (csv, excel). By default it is detected from the extension
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Specify the delimiter to use when reading a CSV file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify that CSV files have no header
    #[arg(long = "no-header")]
    pub no_header: Option<bool>,

    /// Excel sheet to load: 0-based index (e.g. 0) or sheet name (e.g. "Sales")
    #[arg(long = "sheet", value_name = "SHEET")]
    pub excel_sheet: Option<String>,

    /// Try to parse CSV string columns as dates (default: true)
    #[arg(long = "parse-dates", value_name = "BOOL", value_parser = clap::value_parser!(bool))]
    pub parse_dates: Option<bool>,

    /// Number of result rows to print (default: 50)
    #[arg(long = "preview-rows", value_name = "N")]
    pub preview_rows: Option<usize>,

    /// Enable debug logging
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/datablend/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

impl Args {
    /// Split each `--keys` value on commas. Empty segments are dropped.
    pub fn key_lists(&self) -> Vec<Vec<String>> {
        self.keys
            .iter()
            .map(|k| {
                k.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .collect()
    }
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if !arg.get_action().takes_values() || placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
