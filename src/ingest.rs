//! Parse uploaded bytes or files into [`Dataset`]s.
//!
//! Ingestion only parses. Row and capacity limits are applied by the
//! [`Session`](crate::session::Session) so every ingestion path shares them.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::IngestError;
use crate::error_display::{user_message_from_polars, user_message_from_report};
use crate::excel;
use crate::{CompressionFormat, FileFormat};

/// Parsing knobs, filled from `[file_loading]` and CLI overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub try_parse_dates: bool,
    /// 0-based index or sheet name.
    pub excel_sheet: Option<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            try_parse_dates: true,
            excel_sheet: None,
        }
    }
}

/// Parse an in-memory upload. `extension` is the declared file type (csv, xls, xlsx).
pub fn read_bytes(
    name: &str,
    bytes: &[u8],
    extension: &str,
    options: &ReadOptions,
) -> Result<Dataset, IngestError> {
    let format = FileFormat::from_extension(extension).ok_or_else(|| IngestError::UnsupportedFormat {
        name: name.to_string(),
        extension: extension.to_string(),
    })?;
    read_bytes_as(name, bytes, format, options)
}

/// Parse bytes whose format is already known.
pub fn read_bytes_as(
    name: &str,
    bytes: &[u8],
    format: FileFormat,
    options: &ReadOptions,
) -> Result<Dataset, IngestError> {
    let frame = match format {
        FileFormat::Csv => read_csv(bytes, options).map_err(|e| IngestError::Parse {
            name: name.to_string(),
            message: user_message_from_polars(&e),
        })?,
        FileFormat::Excel => excel::read_workbook(bytes, options.excel_sheet.as_deref()).map_err(|e| {
            IngestError::Parse {
                name: name.to_string(),
                message: user_message_from_report(&e),
            }
        })?,
    };
    debug!(name, rows = frame.height(), columns = frame.width(), "parsed dataset");
    Ok(Dataset::new(name, frame))
}

/// Read a file from disk. CSV files may be gzip, zstd, bzip2 or xz compressed
/// (`sales.csv.gz`). `format` overrides extension detection.
pub fn read_path(
    path: &Path,
    format: Option<FileFormat>,
    options: &ReadOptions,
) -> Result<Dataset, IngestError> {
    let name = display_name(path);
    let compression = CompressionFormat::from_extension(path);
    // `data.csv.gz` is detected from the inner extension
    let inner = match compression {
        Some(_) => Path::new(path.file_stem().unwrap_or_default()),
        None => path,
    };
    let format = match format.or_else(|| FileFormat::from_path(inner)) {
        Some(f) => f,
        None => {
            return Err(IngestError::UnsupportedFormat {
                extension: inner
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default()
                    .to_string(),
                name,
            })
        }
    };
    let bytes = read_file(path, compression).map_err(|source| IngestError::Io {
        name: name.clone(),
        source,
    })?;
    read_bytes_as(&name, &bytes, format, options)
}

fn read_csv(bytes: &[u8], options: &ReadOptions) -> PolarsResult<DataFrame> {
    let mut read_options = CsvReadOptions::default();
    read_options.has_header = options.has_header;
    read_options = read_options.map_parse_options(|opts| {
        opts.with_separator(options.delimiter)
            .with_try_parse_dates(options.try_parse_dates)
    });
    CsvReader::new(Cursor::new(bytes.to_vec()))
        .with_options(read_options)
        .finish()
}

fn read_file(path: &Path, compression: Option<CompressionFormat>) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut reader: Box<dyn Read> = match compression {
        None => Box::new(BufReader::new(file)),
        Some(CompressionFormat::Gzip) => Box::new(flate2::read::GzDecoder::new(BufReader::new(file))),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Decoder::new(file)?),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::read::BzDecoder::new(BufReader::new(file))),
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(BufReader::new(file))),
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
