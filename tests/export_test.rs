use std::fs::File;
use std::io::Read;

use datablend::{export_dataset, CompressionFormat, Dataset, ExportFormat, ExportOptions};
use polars::prelude::*;
use tempfile::TempDir;

fn result() -> Dataset {
    Dataset::new(
        "join_result",
        df!("id" => [1i64, 2], "name" => ["p", "q"]).unwrap(),
    )
}

#[test]
fn test_export_csv_with_delimiter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let options = ExportOptions {
        csv_delimiter: b';',
        ..ExportOptions::default()
    };
    export_dataset(&result(), &path, ExportFormat::Csv, &options).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "id;name\n1;p\n2;q\n");
}

#[test]
fn test_export_csv_without_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let options = ExportOptions {
        include_header: false,
        ..ExportOptions::default()
    };
    export_dataset(&result(), &path, ExportFormat::Csv, &options).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,p\n2,q\n");
}

#[test]
fn test_export_parquet_reads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.parquet");
    export_dataset(&result(), &path, ExportFormat::Parquet, &ExportOptions::default()).unwrap();
    let df = ParquetReader::new(File::open(&path).unwrap()).finish().unwrap();
    assert!(df.equals(result().frame()));
}

#[test]
fn test_export_gzip_ndjson() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.ndjson.gz");
    let options = ExportOptions {
        compression: Some(CompressionFormat::Gzip),
        ..ExportOptions::default()
    };
    export_dataset(&result(), &path, ExportFormat::Ndjson, &options).unwrap();

    let mut text = String::new();
    flate2::read::GzDecoder::new(File::open(&path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"name\":\"p\""));
}

#[test]
fn test_export_json_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");
    export_dataset(&result(), &path, ExportFormat::Json, &ExportOptions::default()).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value.as_array().map(|a| a.len()), Some(2));
}
