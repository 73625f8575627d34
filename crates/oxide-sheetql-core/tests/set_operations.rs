//! Tests for UNION, UNION ALL, INTERSECT and EXCEPT.

mod common;
use common::*;

use std::collections::HashSet;

use oxide_sheetql_core::{SheetqlError, Value};

#[test]
fn union_removes_duplicate_rows() {
    let rows = query("SELECT author_id FROM books UNION SELECT id FROM authors");
    assert_eq!(rows[0], texts(&["author_id"]));
    let values: Vec<Value> = rows.into_iter().skip(1).flatten().collect();
    assert_eq!(values, numbers(&[11, 12, 14, 15, 13, 99, 16]));
    let unique: HashSet<String> = values.iter().map(ToString::to_string).collect();
    assert_eq!(unique.len(), values.len());
}

#[test]
fn union_all_keeps_every_row() {
    let rows = query_rows("SELECT author_id FROM books UNION ALL SELECT id FROM authors");
    assert_eq!(rows.len(), 9 + 6);
}

#[test]
fn intersect_keeps_rows_found_on_both_sides() {
    assert_eq!(
        query_column("SELECT id FROM authors INTERSECT SELECT author_id FROM books"),
        numbers(&[11, 12, 13, 14, 15])
    );
}

#[test]
fn except_removes_rows_found_on_the_right() {
    assert_eq!(
        query_column("SELECT id FROM authors EXCEPT SELECT author_id FROM books"),
        numbers(&[16])
    );
}

#[test]
fn operations_apply_left_to_right() {
    assert_eq!(
        query_column(
            "SELECT id FROM authors WHERE id < 13 \
             UNION SELECT id FROM authors WHERE id > 14 \
             EXCEPT SELECT 16 FROM authors"
        ),
        numbers(&[11, 12, 15])
    );
}

#[test]
fn multi_column_signatures() {
    let rows = query_rows(
        "SELECT id, last_name FROM authors WHERE id < 13 \
         INTERSECT SELECT id, last_name FROM authors WHERE last_name = 'Writer'",
    );
    assert_eq!(rows, vec![vec![Value::from(11), Value::from("Writer")]]);
}

#[test]
fn column_count_mismatch_is_an_error() {
    let err = query_err("SELECT id, last_name FROM authors UNION SELECT id FROM books");
    assert!(matches!(err, SheetqlError::SetOperation(_)));
}
