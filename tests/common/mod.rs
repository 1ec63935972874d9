#![allow(dead_code)]

use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

use datablend::Dataset;

/// Write `df` as CSV into `dir` and return the path.
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// CSV text with an `id` column of `rows` rows.
pub fn csv_with_rows(rows: usize) -> Vec<u8> {
    let mut out = String::from("id,value\n");
    for i in 0..rows {
        out.push_str(&format!("{},{}\n", i, i % 7));
    }
    out.into_bytes()
}

pub fn sales() -> Dataset {
    Dataset::new(
        "sales.csv",
        df!(
            "day" => ["Mon", "Mon", "Tue", "Wed", "Tue"],
            "type" => ["A", "B", "A", "B", "B"],
            "amt" => [10i64, 5, 7, 3, 1]
        )
        .unwrap(),
    )
}

pub fn i64_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}
