//! Excel workbook → DataFrame via calamine.
//!
//! Column types are inferred per column so numbers, booleans and dates keep
//! their type instead of being stringified.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;

/// Inferred type for an Excel column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExcelColType {
    Int64,
    Float64,
    Boolean,
    Utf8,
    Date,
    Datetime,
}

/// Read one sheet of a workbook held in memory. The first row is the header.
/// `sheet` is a 0-based index or a sheet name; the first sheet by default.
pub fn read_workbook(bytes: &[u8], sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| eyre!("Excel: {}", e))?;
    if workbook.sheet_names().is_empty() {
        return Err(eyre!("Excel file has no worksheets"));
    }
    let range = match sheet {
        Some(sel) => match sel.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| eyre!("Excel: no sheet at index {}", idx))?
                .map_err(|e| eyre!("Excel: {}", e))?,
            Err(_) => workbook
                .worksheet_range(sel)
                .map_err(|e| eyre!("Excel: {}", e))?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| eyre!("Excel: no first sheet"))?
            .map_err(|e| eyre!("Excel: {}", e))?,
    };
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    rows_to_frame(&rows)
}

fn rows_to_frame(rows: &[Vec<Data>]) -> Result<DataFrame> {
    let Some((header_row, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };
    let mut columns = Vec::with_capacity(header_row.len());
    for (col_idx, header) in header_row.iter().enumerate() {
        let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(col_idx)).collect();
        let header = calamine::DataType::as_string(header).unwrap_or_else(|| header.to_string());
        let name = if header.trim().is_empty() {
            format!("column_{}", col_idx + 1)
        } else {
            header
        };
        let series = column_to_series(&name, &cells, infer_column_type(&cells))?;
        columns.push(series.into());
    }
    Ok(DataFrame::new(columns)?)
}

/// Prefers Int64 for whole-number floats; infers Date/Datetime for calamine
/// date cells or for string columns that all parse as ISO dates.
fn infer_column_type(cells: &[Option<&Data>]) -> ExcelColType {
    use calamine::DataType as CalamineTrait;
    let mut has_string = false;
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        if CalamineTrait::is_string(*cell) {
            has_string = true;
            break;
        }
        if CalamineTrait::is_datetime(*cell) || CalamineTrait::is_datetime_iso(*cell) {
            has_datetime = true;
            has_float = true;
        } else if CalamineTrait::is_float(*cell) {
            has_float = true;
        }
        if CalamineTrait::is_int(*cell) {
            has_int = true;
        }
        if CalamineTrait::is_bool(*cell) {
            has_bool = true;
        }
    }
    if has_string {
        let parsed: Vec<Option<NaiveDateTime>> = cells
            .iter()
            .flatten()
            .filter(|c| !CalamineTrait::is_empty(**c))
            .map(|c| cell_to_naive_datetime(c))
            .collect();
        if !parsed.is_empty() && parsed.iter().all(Option::is_some) {
            date_or_datetime(cells)
        } else {
            ExcelColType::Utf8
        }
    } else if has_datetime {
        date_or_datetime(cells)
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| {
            cell.as_f64()
                .is_none_or(|f| f.is_finite() && (f - f.trunc()).abs() < 1e-10)
        });
        if all_whole {
            ExcelColType::Int64
        } else {
            ExcelColType::Float64
        }
    } else if has_int {
        ExcelColType::Int64
    } else if has_bool {
        ExcelColType::Boolean
    } else {
        ExcelColType::Utf8
    }
}

fn date_or_datetime(cells: &[Option<&Data>]) -> ExcelColType {
    let midnight = NaiveTime::MIN;
    let all_midnight = cells
        .iter()
        .flatten()
        .filter_map(|c| cell_to_naive_datetime(c))
        .all(|dt| dt.time() == midnight);
    if all_midnight {
        ExcelColType::Date
    } else {
        ExcelColType::Datetime
    }
}

/// Excel serial, DateTimeIso, or a parseable string.
fn cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_naive_datetime_str(s)
}

fn parse_naive_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn column_to_series(name: &str, cells: &[Option<&Data>], col_type: ExcelColType) -> Result<Series> {
    use calamine::DataType as CalamineTrait;
    let series = match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(|cell| cell.as_i64())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|cell| cell.as_f64())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(|cell| cell.get_bool())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.filter(|cell| !CalamineTrait::is_empty(*cell)).and_then(|cell| cell.as_string()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or_else(|| eyre!("invalid epoch"))?;
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .and_then(|dt| i32::try_from((dt.date() - epoch).num_days()).ok())
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        ExcelColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(cell_to_naive_datetime).map(|dt| dt.and_utc().timestamp_micros()))
                .collect();
            Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}
