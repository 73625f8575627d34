//! Tests for GROUP BY, aggregates, HAVING and PIVOT.

mod common;
use common::*;

use oxide_sheetql_core::Value;

fn day(d: u32) -> Value {
    Value::date(2022, 5, d)
}

#[test]
fn group_with_sum_and_count() {
    let rows = query(
        "SELECT customer_id, SUM(quantity), COUNT(*) FROM sales GROUP BY customer_id",
    );
    assert_eq!(
        rows,
        vec![
            texts(&["customer_id", "SUM(quantity)", "COUNT(*)"]),
            vec![Value::from("C1"), Value::from(15), Value::from(3)],
            vec![Value::from("C2"), Value::from(5), Value::from(1)],
            vec![Value::from("C3"), Value::from(7), Value::from(1)],
        ]
    );
}

#[test]
fn aggregates_without_group_collapse_to_one_row() {
    let rows = query_rows(
        "SELECT SUM(quantity), MIN(price), MAX(price), AVG(quantity) FROM sales",
    );
    assert_eq!(
        rows,
        vec![vec![
            Value::from(27),
            Value::from(1),
            Value::from(10),
            Value::from(5.4),
        ]]
    );
}

#[test]
fn aggregates_over_no_rows() {
    let rows = query_rows("SELECT COUNT(*), SUM(quantity) FROM sales WHERE quantity > 100");
    assert_eq!(rows, vec![numbers(&[0, 0])]);
}

#[test]
fn group_by_column_not_selected() {
    assert_eq!(
        query_column("SELECT SUM(quantity) FROM sales GROUP BY date"),
        numbers(&[15, 5, 7])
    );
}

#[test]
fn count_distinct() {
    let rows = query_rows(
        "SELECT date, COUNT(DISTINCT customer_id) FROM sales GROUP BY date",
    );
    assert_eq!(
        rows,
        vec![
            vec![day(1), Value::from(2)],
            vec![day(2), Value::from(1)],
            vec![day(3), Value::from(1)],
        ]
    );
}

#[test]
fn having_on_selected_aggregate() {
    assert_eq!(
        query_column(
            "SELECT customer_id, SUM(quantity) FROM sales GROUP BY customer_id \
             HAVING SUM(quantity) > 6"
        ),
        texts(&["C1", "C3"])
    );
}

#[test]
fn having_on_hidden_aggregate_and_alias() {
    assert_eq!(
        query_column("SELECT customer_id FROM sales GROUP BY customer_id HAVING COUNT(*) > 1"),
        texts(&["C1"])
    );
    assert_eq!(
        query_column(
            "SELECT customer_id, SUM(quantity) AS total FROM sales GROUP BY customer_id \
             HAVING total < 10"
        ),
        texts(&["C2", "C3"])
    );
}

#[test]
fn order_by_aggregate_alias() {
    let rows = query_rows(
        "SELECT customer_id, SUM(quantity) AS total FROM sales GROUP BY customer_id \
         ORDER BY total DESC",
    );
    assert_eq!(
        rows,
        vec![
            vec![Value::from("C1"), Value::from(15)],
            vec![Value::from("C3"), Value::from(7)],
            vec![Value::from("C2"), Value::from(5)],
        ]
    );
}

#[test]
fn group_by_joined_column() {
    let rows = query_rows(
        "SELECT authors.last_name, COUNT(*) FROM books \
         INNER JOIN authors ON books.author_id = authors.id \
         GROUP BY authors.last_name ORDER BY 2 DESC, 1 LIMIT 2",
    );
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Writer"), Value::from(3)],
            vec![Value::from("Savelieva"), Value::from(2)],
        ]
    );
}

#[test]
fn regrouping_is_idempotent() {
    let once = query_rows("SELECT customer_id, SUM(quantity) FROM sales GROUP BY customer_id");
    let twice = query_rows(
        "SELECT customer_id, SUM(total) FROM \
         (SELECT customer_id, SUM(quantity) AS total FROM sales GROUP BY customer_id) AS t \
         GROUP BY customer_id",
    );
    assert_eq!(once, twice);
}

#[test]
fn pivot_one_column_per_value() {
    let rows = query("SELECT date, SUM(quantity) FROM sales GROUP BY date PIVOT customer_id");
    assert_eq!(
        rows,
        vec![
            texts(&[
                "date",
                "C1 SUM(quantity)",
                "C2 SUM(quantity)",
                "C3 SUM(quantity)",
            ]),
            vec![day(1), Value::from(10), Value::from(5), Value::from(0)],
            vec![day(2), Value::from(5), Value::from(0), Value::from(0)],
            vec![day(3), Value::from(0), Value::from(0), Value::from(7)],
        ]
    );
}

#[test]
fn pivot_count_star() {
    let rows = query_rows("SELECT customer_id, COUNT(*) FROM sales GROUP BY customer_id PIVOT date");
    assert_eq!(
        rows[0],
        vec![Value::from("C1"), Value::from(1), Value::from(2), Value::from(0)]
    );
}

#[test]
fn pivot_requires_group_by() {
    assert!(query_err("SELECT SUM(quantity) FROM sales PIVOT customer_id").is_syntax());
}

#[test]
fn unknown_group_column() {
    assert!(query_err("SELECT SUM(quantity) FROM sales GROUP BY nope").is_syntax());
}

#[test]
fn nested_aggregate_is_rejected() {
    assert!(query_err("SELECT SUM(quantity) + 1 FROM sales").is_syntax());
}

#[test]
fn group_by_calculated_key_over_text_cells() {
    let rows = query_rows("SELECT qty * 2, COUNT(*) FROM stock GROUP BY qty * 2");
    assert_eq!(rows.len(), 49);
    assert_eq!(rows[0], vec![Value::from(2), Value::from(1)]);
    let last = &rows[48];
    assert!(last[0].as_number().is_some_and(f64::is_nan));
    assert_eq!(last[1], Value::from(12));
}
