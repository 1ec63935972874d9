//! Write a result dataset to disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use tracing::info;

use crate::dataset::Dataset;
use crate::CompressionFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
    Json,
    Ndjson,
}

impl ExportFormat {
    /// Infer from the extension, looking past a compression suffix (`out.csv.gz`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let inner = match CompressionFormat::from_extension(path) {
            Some(_) => Path::new(path.file_stem()?),
            None => path,
        };
        match inner.extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "parquet" => Some(Self::Parquet),
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            _ => None,
        }
    }

    pub fn supports_compression(self) -> bool {
        !matches!(self, Self::Parquet)
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub csv_delimiter: u8,
    pub include_header: bool,
    pub compression: Option<CompressionFormat>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            csv_delimiter: b',',
            include_header: true,
            compression: None,
        }
    }
}

pub fn export_dataset(
    dataset: &Dataset,
    path: &Path,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<()> {
    if options.compression.is_some() && !format.supports_compression() {
        return Err(eyre!("Parquet output is compressed internally; drop --compression"));
    }
    let mut df = dataset.frame().clone();
    match format {
        ExportFormat::Csv => {
            CsvWriter::new(open_writer(path, options.compression)?)
                .with_separator(options.csv_delimiter)
                .include_header(options.include_header)
                .finish(&mut df)?;
        }
        ExportFormat::Parquet => {
            let mut writer = BufWriter::new(File::create(path)?);
            ParquetWriter::new(&mut writer).finish(&mut df)?;
        }
        ExportFormat::Json => {
            JsonWriter::new(open_writer(path, options.compression)?)
                .with_json_format(JsonFormat::Json)
                .finish(&mut df)?;
        }
        ExportFormat::Ndjson => {
            JsonWriter::new(open_writer(path, options.compression)?)
                .with_json_format(JsonFormat::JsonLines)
                .finish(&mut df)?;
        }
    }
    info!(path = %path.display(), rows = df.height(), "exported result");
    Ok(())
}

/// Encoders finish their stream when dropped.
fn open_writer(path: &Path, compression: Option<CompressionFormat>) -> Result<Box<dyn Write>> {
    let file = File::create(path)?;
    let writer: Box<dyn Write> = match compression {
        None => Box::new(BufWriter::new(file)),
        Some(CompressionFormat::Gzip) => Box::new(flate2::write::GzEncoder::new(
            file,
            flate2::Compression::default(),
        )),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Encoder::new(file, 0)?.auto_finish()),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::write::BzEncoder::new(
            file,
            bzip2::Compression::default(),
        )),
        Some(CompressionFormat::Xz) => Box::new(xz2::write::XzEncoder::new(
            file, 6, // compression level
        )),
    };
    Ok(writer)
}
