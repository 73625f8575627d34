//! Tests for IN, scalar, EXISTS and correlated subqueries.

mod common;
use common::*;

use oxide_sheetql_core::Value;

#[test]
fn in_subquery() {
    assert_eq!(
        query_column(
            "SELECT title FROM books WHERE author_id IN \
             (SELECT id FROM authors WHERE last_name = 'Savelieva') ORDER BY id"
        ),
        texts(&["Your Trip", "Oranges"])
    );
}

#[test]
fn not_in_subquery() {
    assert_eq!(
        query_column(
            "SELECT last_name FROM authors WHERE id NOT IN (SELECT author_id FROM books)"
        ),
        texts(&["Unpublished"])
    );
}

#[test]
fn scalar_subquery_in_condition() {
    assert_eq!(
        query_column(
            "SELECT title FROM books WHERE author_id = \
             (SELECT MAX(id) FROM authors WHERE id < 16)"
        ),
        texts(&["Your Happy Life"])
    );
}

#[test]
fn correlated_scalar_subquery_field() {
    let rows = query(
        "SELECT title, (SELECT last_name FROM authors WHERE id = books.author_id) AS author \
         FROM books WHERE id <= 3 ORDER BY id",
    );
    assert_eq!(
        rows,
        vec![
            texts(&["title", "author"]),
            texts(&["Time to Grow Up!", "Writer"]),
            texts(&["Your Trip", "Savelieva"]),
            texts(&["Lovely Love", "Brain"]),
        ]
    );
}

#[test]
fn correlated_subquery_without_match_is_null() {
    let rows = query_rows(
        "SELECT (SELECT last_name FROM authors WHERE id = books.author_id) FROM books WHERE id = 9",
    );
    assert_eq!(rows, vec![vec![Value::Null]]);
}

#[test]
fn exists_and_not_exists() {
    assert_eq!(
        query_column(
            "SELECT last_name FROM authors WHERE EXISTS \
             (SELECT id FROM books WHERE books.author_id = authors.id) ORDER BY last_name"
        ),
        texts(&["Brain", "Dou", "Savelieva", "Smart", "Writer"])
    );
    assert_eq!(
        query_column(
            "SELECT last_name FROM authors WHERE NOT EXISTS \
             (SELECT id FROM books WHERE books.author_id = authors.id)"
        ),
        texts(&["Unpublished"])
    );
}

#[test]
fn correlated_count_per_row() {
    let rows = query_rows(
        "SELECT last_name, (SELECT COUNT(*) FROM books WHERE books.author_id = authors.id) AS n \
         FROM authors WHERE id IN (11, 16) ORDER BY id",
    );
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Writer"), Value::from(3)],
            vec![Value::from("Unpublished"), Value::from(0)],
        ]
    );
}

#[test]
fn subquery_with_bind_value() {
    let rows = sql()
        .add_bind("Writer")
        .enable_column_titles(false)
        .execute(
            "SELECT id FROM books WHERE author_id IN \
             (SELECT id FROM authors WHERE last_name = ?1) ORDER BY id",
        )
        .unwrap();
    assert_eq!(rows, vec![numbers(&[1]), numbers(&[4]), numbers(&[8])]);
}
