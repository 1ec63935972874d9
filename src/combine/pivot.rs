use polars::lazy::frame::pivot::pivot_stable;
use polars::prelude::*;
use tracing::{debug, warn};

use super::{result_name, Aggregation, Combined, OperationKind, PivotSpec, Provenance};
use crate::dataset::Dataset;
use crate::error::{CombineError, ValidationError};
use crate::guardrail::{self, Limits};
use crate::validate;

fn group_agg_expr(agg: Aggregation, values: &str) -> Expr {
    let e = col(values);
    match agg {
        Aggregation::Sum => e.sum(),
        Aggregation::Mean => e.mean(),
        Aggregation::Count => e.count(),
        Aggregation::Min => e.min(),
        Aggregation::Max => e.max(),
    }
}

/// Reshape the single input into an (index value) x (header value) grid.
///
/// Rows with a null index or header are dropped. The grid size is checked
/// against the cell limits before it is built. Each (index, header) group is
/// aggregated first, so combinations with no rows stay null.
pub fn pivot(inputs: &[Dataset], spec: &PivotSpec, limits: &Limits) -> Result<Combined, CombineError> {
    validate::check_pivot(inputs, spec)?;
    let source = &inputs[0];

    // pivot_stable panics on a Date/Datetime index; pivot on the physical
    // integers and cast back afterwards.
    let index_dtype = source.dtype(&spec.index).unwrap_or(DataType::Null);
    let index_expr = match physical_index_dtype(&index_dtype) {
        Some(physical) => col(spec.index.as_str()).cast(physical),
        None => col(spec.index.as_str()),
    };

    let df = source
        .frame()
        .clone()
        .lazy()
        .filter(
            col(spec.index.as_str())
                .is_not_null()
                .and(col(spec.columns.as_str()).is_not_null()),
        )
        .select([
            index_expr,
            col(spec.columns.as_str()),
            col(spec.values.as_str()),
        ])
        .collect()
        .map_err(CombineError::polars("pivot"))?;

    let n_rows = distinct(&df, &spec.index)?;
    let n_cols = distinct(&df, &spec.columns)?;
    let warning = guardrail::check_cells(n_rows, n_cols, limits)?;
    if let Some(w) = &warning {
        warn!(cells = w.cells, threshold = w.threshold, "large pivot result");
    }
    check_header_clash(&df, spec)?;

    let grouped = df
        .lazy()
        .group_by_stable([col(spec.index.as_str()), col(spec.columns.as_str())])
        .agg([group_agg_expr(spec.aggregation, &spec.values)])
        .collect()
        .map_err(CombineError::polars("pivot"))?;

    let pivoted = pivot_stable(
        &grouped,
        [spec.columns.as_str()],
        Some([spec.index.as_str()]),
        Some([spec.values.as_str()]),
        true,
        Some(col(PlSmallStr::from_static("")).first()),
        None,
    )
    .and_then(|p| {
        let mut lf = p.lazy();
        if physical_index_dtype(&index_dtype).is_some() {
            lf = lf.with_column(col(spec.index.as_str()).cast(index_dtype.clone()));
        }
        lf.sort_by_exprs([col(spec.index.as_str())], Default::default())
            .collect()
    })
    .map_err(CombineError::polars("pivot"))?;

    debug!(
        rows = pivoted.height(),
        columns = pivoted.width(),
        aggregation = spec.aggregation.as_str(),
        "pivot complete"
    );

    Ok(Combined {
        dataset: Dataset::new(result_name(OperationKind::Pivot), pivoted),
        provenance: Provenance::new(OperationKind::Pivot, inputs),
        warning,
    })
}

fn physical_index_dtype(dtype: &DataType) -> Option<DataType> {
    match dtype {
        DataType::Date => Some(DataType::Int32),
        DataType::Datetime(_, _) => Some(DataType::Int64),
        _ => None,
    }
}

/// A header value equal to the index name would produce two columns with
/// that name.
fn check_header_clash(df: &DataFrame, spec: &PivotSpec) -> Result<(), CombineError> {
    let headers = df
        .column(&spec.columns)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(CombineError::polars("pivot"))?;
    let clash = headers
        .str()
        .map_err(CombineError::polars("pivot"))?
        .into_iter()
        .any(|v| v == Some(spec.index.as_str()));
    if clash {
        return Err(ValidationError::PivotHeaderClash {
            column: spec.columns.clone(),
            index: spec.index.clone(),
        }
        .into());
    }
    Ok(())
}

fn distinct(df: &DataFrame, name: &str) -> Result<usize, CombineError> {
    df.column(name)
        .and_then(|c| c.n_unique())
        .map_err(CombineError::polars("pivot"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(agg: Aggregation) -> PivotSpec {
        PivotSpec {
            index: "day".to_string(),
            columns: "type".to_string(),
            values: "amt".to_string(),
            aggregation: agg,
        }
    }

    fn sales() -> Dataset {
        Dataset::new(
            "sales",
            df!(
                "day" => ["Tue", "Mon", "Mon", "Tue", "Mon"],
                "type" => ["A", "A", "B", "A", "A"],
                "amt" => [Some(4.0), Some(10.0), Some(5.0), Some(6.0), None]
            )
            .unwrap(),
        )
    }

    fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_pivot_sum_example() {
        let ds = Dataset::new(
            "s",
            df!("day" => ["Mon", "Mon"], "type" => ["A", "B"], "amt" => [10i64, 5]).unwrap(),
        );
        let out = pivot(&[ds], &spec(Aggregation::Sum), &Limits::default()).unwrap();
        let df = out.dataset.frame();
        assert_eq!(out.dataset.column_names(), vec!["day", "A", "B"]);
        assert_eq!(df.height(), 1);
        assert_eq!(floats(df, "A"), vec![Some(10.0)]);
        assert_eq!(floats(df, "B"), vec![Some(5.0)]);
        assert!(out.warning.is_none());
    }

    #[test]
    fn test_pivot_shape_and_sorted_index() {
        let out = pivot(&[sales()], &spec(Aggregation::Sum), &Limits::default()).unwrap();
        let df = out.dataset.frame();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        let days: Vec<Option<&str>> = df.column("day").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(days, vec![Some("Mon"), Some("Tue")]);
        assert_eq!(floats(df, "A"), vec![Some(10.0), Some(10.0)]);
        // Tue has no B rows
        assert_eq!(floats(df, "B"), vec![Some(5.0), None]);
    }

    #[test]
    fn test_pivot_count_ignores_nulls() {
        let out = pivot(&[sales()], &spec(Aggregation::Count), &Limits::default()).unwrap();
        let df = out.dataset.frame();
        assert_eq!(floats(df, "A"), vec![Some(1.0), Some(2.0)]);
        // no Tue/B rows at all
        assert_eq!(floats(df, "B"), vec![Some(1.0), None]);
    }

    #[test]
    fn test_empty_combinations_are_null_for_every_aggregation() {
        let ds = Dataset::new(
            "s",
            df!(
                "day" => ["Mon", "Mon", "Tue"],
                "type" => ["A", "B", "A"],
                "amt" => [10i64, 5, 4]
            )
            .unwrap(),
        );
        for agg in Aggregation::ALL {
            let out = pivot(std::slice::from_ref(&ds), &spec(agg), &Limits::default()).unwrap();
            let b = floats(out.dataset.frame(), "B");
            assert_eq!(b[1], None, "{} filled an empty cell", agg.as_str());
        }
    }

    #[test]
    fn test_header_value_named_like_index_is_rejected() {
        let ds = Dataset::new(
            "s",
            df!("day" => ["Mon", "Tue"], "type" => ["A", "day"], "amt" => [1i64, 2]).unwrap(),
        );
        let err = pivot(&[ds], &spec(Aggregation::Sum), &Limits::default()).unwrap_err();
        assert!(matches!(
            err,
            CombineError::Validation(ValidationError::PivotHeaderClash { .. })
        ));
    }

    #[test]
    fn test_pivot_mean_min_max() {
        let limits = Limits::default();
        let mean = pivot(&[sales()], &spec(Aggregation::Mean), &limits).unwrap();
        assert_eq!(floats(mean.dataset.frame(), "A"), vec![Some(10.0), Some(5.0)]);
        let min = pivot(&[sales()], &spec(Aggregation::Min), &limits).unwrap();
        assert_eq!(floats(min.dataset.frame(), "A"), vec![Some(10.0), Some(4.0)]);
        let max = pivot(&[sales()], &spec(Aggregation::Max), &limits).unwrap();
        assert_eq!(floats(max.dataset.frame(), "A"), vec![Some(10.0), Some(6.0)]);
    }

    #[test]
    fn test_sum_equals_count_times_mean() {
        let limits = Limits::default();
        let sum = pivot(&[sales()], &spec(Aggregation::Sum), &limits).unwrap();
        let count = pivot(&[sales()], &spec(Aggregation::Count), &limits).unwrap();
        let mean = pivot(&[sales()], &spec(Aggregation::Mean), &limits).unwrap();
        let s = floats(sum.dataset.frame(), "A");
        let c = floats(count.dataset.frame(), "A");
        let m = floats(mean.dataset.frame(), "A");
        for i in 0..s.len() {
            let (s, c, m) = (s[i].unwrap(), c[i].unwrap(), m[i].unwrap());
            assert!((s - c * m).abs() < 1e-9, "row {i}: {s} != {c} * {m}");
        }
    }

    #[test]
    fn test_null_index_and_header_rows_dropped() {
        let ds = Dataset::new(
            "s",
            df!(
                "day" => [Some("Mon"), None, Some("Mon")],
                "type" => [Some("A"), Some("A"), None],
                "amt" => [1i64, 2, 3]
            )
            .unwrap(),
        );
        let out = pivot(&[ds], &spec(Aggregation::Sum), &Limits::default()).unwrap();
        assert_eq!(out.dataset.column_names(), vec!["day", "A"]);
        assert_eq!(out.dataset.height(), 1);
    }

    #[test]
    fn test_pivot_size_limits() {
        let limits = Limits {
            warn_cells: 3,
            max_cells: 4,
            ..Limits::default()
        };
        let ds = Dataset::new(
            "s",
            df!(
                "day" => ["a", "b", "c"],
                "type" => ["x", "y", "y"],
                "amt" => [1i64, 2, 3]
            )
            .unwrap(),
        );
        // 3 x 2 = 6 cells
        let err = pivot(std::slice::from_ref(&ds), &spec(Aggregation::Sum), &limits).unwrap_err();
        assert!(matches!(err, CombineError::SizeLimit { cells: 6, limit: 4 }));

        let limits = Limits {
            warn_cells: 5,
            max_cells: 10,
            ..Limits::default()
        };
        let out = pivot(&[ds], &spec(Aggregation::Sum), &limits).unwrap();
        assert_eq!(out.warning.map(|w| w.cells), Some(6));
    }

    #[test]
    fn test_pivot_keeps_date_index() {
        let days = Series::new("day".into(), [19_000i32, 19_001, 19_000])
            .cast(&DataType::Date)
            .unwrap();
        let mut df = df!("type" => ["A", "A", "B"], "amt" => [1i64, 2, 3]).unwrap();
        df.with_column(days).unwrap();
        let out = pivot(&[Dataset::new("d", df)], &spec(Aggregation::Sum), &Limits::default()).unwrap();
        assert_eq!(out.dataset.dtype("day"), Some(DataType::Date));
        assert_eq!(out.dataset.height(), 2);
        assert_eq!(floats(out.dataset.frame(), "A"), vec![Some(1.0), Some(2.0)]);
        assert_eq!(floats(out.dataset.frame(), "B"), vec![Some(3.0), None]);
    }

    #[test]
    fn test_pivot_rejects_text_values() {
        let ds = Dataset::new(
            "s",
            df!("day" => ["Mon"], "type" => ["A"], "amt" => ["ten"]).unwrap(),
        );
        let err = pivot(&[ds], &spec(Aggregation::Sum), &Limits::default()).unwrap_err();
        assert!(matches!(
            err,
            CombineError::Validation(ValidationError::NonNumericValue { .. })
        ));
    }
}
