mod common;

use datablend::combine::execute;
use datablend::{
    Aggregation, CombineError, Dataset, JoinHow, JoinSpec, Limits, Operation, OperationKind,
    PivotSpec, ValidationError,
};
use polars::prelude::*;

use common::{i64_values, sales};

fn keys(lists: &[&[&str]]) -> Vec<Vec<String>> {
    lists
        .iter()
        .map(|l| l.iter().map(|s| s.to_string()).collect())
        .collect()
}

#[test]
fn test_union_row_count_is_sum_of_inputs() {
    let a = Dataset::new("a", df!("a" => [1i64, 2, 3], "b" => ["x", "y", "z"]).unwrap());
    let b = Dataset::new("b", df!("a" => [4i64], "b" => ["w"]).unwrap());
    let c = Dataset::new("c", df!("a" => [5i64, 6], "b" => ["v", "u"]).unwrap());
    let out = execute(&Operation::Union, &[a, b, c], &Limits::default()).unwrap();
    assert_eq!(out.dataset.height(), 6);
    assert_eq!(out.dataset.column_names(), vec!["a", "b"]);
    assert_eq!(out.provenance.operation, OperationKind::Union);
    assert_eq!(
        i64_values(out.dataset.frame(), "a"),
        (1..=6).map(Some).collect::<Vec<_>>()
    );
}

#[test]
fn test_union_reports_first_mismatch() {
    let a = Dataset::new("a", df!("a" => [1i64], "b" => [2i64]).unwrap());
    let b = Dataset::new("b", df!("a" => [1i64], "b" => [2i64]).unwrap());
    let c = Dataset::new("c", df!("a" => [1i64], "c" => [2i64]).unwrap());
    let d = Dataset::new("d", df!("b" => [1i64], "a" => [2i64]).unwrap());
    let err = execute(&Operation::Union, &[a, b, c, d], &Limits::default()).unwrap_err();
    match err {
        CombineError::Validation(ValidationError::ColumnMismatch { position, found, .. }) => {
            assert_eq!(position, 3);
            assert_eq!(found, vec!["a", "c"]);
        }
        other => panic!("expected column mismatch, got {:?}", other),
    }
}

#[test]
fn test_left_join_with_unique_right_keys_preserves_rows() {
    let left = Dataset::new(
        "left",
        df!("id" => [1i64, 2, 3, 4], "v" => ["a", "b", "c", "d"]).unwrap(),
    );
    let right = Dataset::new("right", df!("id" => [4i64, 2], "w" => [40i64, 20]).unwrap());
    let op = Operation::Join(JoinSpec {
        how: JoinHow::Left,
        keys: keys(&[&["id"], &["id"]]),
    });
    let out = execute(&op, &[left, right], &Limits::default()).unwrap();
    assert_eq!(out.dataset.height(), 4);
    assert_eq!(
        i64_values(out.dataset.frame(), "w"),
        vec![None, Some(20), None, Some(40)]
    );
}

#[test]
fn test_three_way_join_uses_first_input_key_names() {
    let a = Dataset::new("a", df!("id" => [1i64, 2], "v" => [1i64, 2]).unwrap());
    let b = Dataset::new("b", df!("bid" => [2i64, 1], "w" => [20i64, 10]).unwrap());
    let c = Dataset::new("c", df!("cid" => [1i64], "z" => [100i64]).unwrap());
    let op = Operation::Join(JoinSpec {
        how: JoinHow::Inner,
        keys: keys(&[&["id"], &["bid"], &["cid"]]),
    });
    let out = execute(&op, &[a, b, c], &Limits::default()).unwrap();
    let df = out.dataset.frame();
    assert_eq!(
        out.dataset.column_names(),
        vec!["id", "v", "bid", "w", "cid", "z"]
    );
    assert_eq!(i64_values(df, "id"), vec![Some(1)]);
    assert_eq!(i64_values(df, "w"), vec![Some(10)]);
    assert_eq!(i64_values(df, "z"), vec![Some(100)]);
    assert_eq!(out.provenance.steps.len(), 2);
    assert_eq!(out.provenance.steps[0].rows, 2);
    assert_eq!(out.provenance.steps[1].rows, 1);
    assert_eq!(out.provenance.steps[1].preview.height(), 1);
}

#[test]
fn test_join_key_rules() {
    let a = Dataset::new("a", df!("id" => [1i64]).unwrap());
    let b = Dataset::new("b", df!("id" => [1i64]).unwrap());
    let limits = Limits::default();

    let too_many = Operation::Join(JoinSpec {
        how: JoinHow::Inner,
        keys: keys(&[&["id", "id", "id"], &["id", "id", "id"]]),
    });
    assert!(matches!(
        execute(&too_many, &[a.clone(), b.clone()], &limits),
        Err(CombineError::Validation(ValidationError::KeyCountOutOfRange { position: 1, count: 3 }))
    ));

    let missing = Operation::Join(JoinSpec {
        how: JoinHow::Inner,
        keys: keys(&[&["id"], &["nope"]]),
    });
    assert!(matches!(
        execute(&missing, &[a.clone(), b.clone()], &limits),
        Err(CombineError::Validation(ValidationError::MissingColumn { position: 2, .. }))
    ));

    let short = Operation::Join(JoinSpec {
        how: JoinHow::Inner,
        keys: keys(&[&["id"]]),
    });
    assert!(matches!(
        execute(&short, &[a, b], &limits),
        Err(CombineError::Validation(ValidationError::KeyListCount { given: 1, inputs: 2 }))
    ));
}

#[test]
fn test_pivot_shape_matches_distinct_values() {
    let op = Operation::Pivot(PivotSpec {
        index: "day".into(),
        columns: "type".into(),
        values: "amt".into(),
        aggregation: Aggregation::Sum,
    });
    let out = execute(&op, &[sales()], &Limits::default()).unwrap();
    let df = out.dataset.frame();
    // 3 days x 2 types, plus the index column
    assert_eq!(df.height(), 3);
    assert_eq!(out.dataset.column_names(), vec!["day", "A", "B"]);
    assert_eq!(i64_values(df, "A"), vec![Some(10), Some(7), None]);
    assert_eq!(i64_values(df, "B"), vec![Some(5), Some(1), Some(3)]);
}

#[test]
fn test_pivot_rejects_multiple_inputs() {
    let op = Operation::Pivot(PivotSpec {
        index: "day".into(),
        columns: "type".into(),
        values: "amt".into(),
        aggregation: Aggregation::Count,
    });
    let err = execute(&op, &[sales(), sales()], &Limits::default()).unwrap_err();
    assert!(matches!(
        err,
        CombineError::Validation(ValidationError::PivotInputCount { found: 2 })
    ));
}

fn grid(rows: usize, cols: usize) -> Dataset {
    let n = rows * cols;
    let idx: Vec<i64> = (0..n as i64).map(|i| i / cols as i64).collect();
    let hdr: Vec<String> = (0..n).map(|i| format!("c{}", i % cols)).collect();
    let val: Vec<i64> = vec![1; n];
    Dataset::new(
        "grid",
        df!("row" => idx, "col" => hdr, "v" => val).unwrap(),
    )
}

fn grid_pivot() -> Operation {
    Operation::Pivot(PivotSpec {
        index: "row".into(),
        columns: "col".into(),
        values: "v".into(),
        aggregation: Aggregation::Sum,
    })
}

#[test]
fn test_pivot_80000_cells_warns() {
    let out = execute(&grid_pivot(), &[grid(400, 200)], &Limits::default()).unwrap();
    let warning = out.warning.expect("expected size warning");
    assert_eq!(warning.cells, 80_000);
    assert_eq!(warning.threshold, 75_000);
    assert_eq!(out.dataset.height(), 400);
}

#[test]
fn test_pivot_over_hard_ceiling_fails() {
    let limits = Limits {
        warn_cells: 10,
        max_cells: 20,
        ..Limits::default()
    };
    let err = execute(&grid_pivot(), &[grid(7, 3)], &limits).unwrap_err();
    assert!(matches!(err, CombineError::SizeLimit { cells: 21, limit: 20 }));
    assert!(execute(&grid_pivot(), &[grid(5, 4)], &limits).unwrap().warning.is_some());
}
