//! Tests for single-table SELECT: projection, filtering, ordering,
//! DISTINCT, LIMIT, bind variables and output shaping.

mod common;
use common::*;

use oxide_sheetql_core::{Sql, Table, Value};

#[test]
fn title_row_comes_first() {
    let rows = query("SELECT id, last_name AS name FROM authors WHERE id = 11");
    assert_eq!(
        rows,
        vec![
            texts(&["id", "name"]),
            vec![Value::from(11), Value::from("Writer")],
        ]
    );
}

#[test]
fn is_null_on_populated_table_returns_only_titles() {
    let rows = query("SELECT * FROM authors WHERE id IS NULL");
    assert_eq!(
        rows,
        vec![texts(&["AUTHORS.ID", "AUTHORS.FIRST_NAME", "AUTHORS.LAST_NAME"])]
    );
}

#[test]
fn empty_result_without_titles_is_one_blank_cell() {
    let rows = query_rows("SELECT id FROM authors WHERE id > 100");
    assert_eq!(rows, vec![vec![Value::Null]]);
}

#[test]
fn qualified_wildcard() {
    let rows = query_rows("SELECT authors.* FROM authors WHERE id = 12");
    assert_eq!(
        rows,
        vec![vec![Value::from(12), Value::from("Olga"), Value::from("Savelieva")]]
    );
}

#[test]
fn like_is_case_insensitive() {
    let titles = query_column("SELECT title FROM books WHERE title LIKE '%your%' ORDER BY id");
    assert_eq!(titles, texts(&["Your Trip", "Dream Your Life", "Your Happy Life"]));
}

#[test]
fn not_like_and_single_character_wildcard() {
    let names = query_column("SELECT first_name FROM authors WHERE first_name LIKE '_a%' ORDER BY id");
    assert_eq!(names, texts(&["Jack", "Yao"]));
    let names = query_column(
        "SELECT first_name FROM authors WHERE first_name NOT LIKE '%o%' ORDER BY id",
    );
    assert_eq!(names, texts(&["Ellen", "Jack"]));
}

#[test]
fn in_not_in_and_between() {
    assert_eq!(
        query_column("SELECT id FROM books WHERE author_id IN (13, 14) ORDER BY id"),
        numbers(&[3, 7])
    );
    assert_eq!(
        query_column("SELECT id FROM authors WHERE id NOT IN (11, 12, 13) ORDER BY id"),
        numbers(&[14, 15, 16])
    );
    assert_eq!(
        query_column("SELECT id FROM books WHERE id BETWEEN 3 AND 5 ORDER BY id"),
        numbers(&[3, 4, 5])
    );
    assert_eq!(
        query_column("SELECT id FROM books WHERE id NOT BETWEEN 2 AND 8 ORDER BY id"),
        numbers(&[1, 9])
    );
}

#[test]
fn and_or_not_combinations() {
    let ids = query_column(
        "SELECT id FROM books WHERE (author_id = 11 OR author_id = 12) AND NOT id = 4 ORDER BY id",
    );
    assert_eq!(ids, numbers(&[1, 2, 5, 8]));
}

#[test]
fn order_by_several_keys() {
    let rows = query_rows(
        "SELECT author_id, title FROM books WHERE author_id IN (11, 12) \
         ORDER BY author_id DESC, title",
    );
    let titles: Vec<Value> = rows.into_iter().map(|r| r[1].clone()).collect();
    assert_eq!(
        titles,
        texts(&[
            "Oranges",
            "Your Trip",
            "Dream Your Life",
            "My Last Book",
            "Time to Grow Up!",
        ])
    );
}

#[test]
fn order_by_ordinal_and_limit() {
    let rows = query_rows("SELECT title, id FROM books ORDER BY 2 DESC LIMIT 2");
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Orphan"), Value::from(9)],
            vec![Value::from("My Last Book"), Value::from(8)],
        ]
    );
}

#[test]
fn order_by_column_not_selected() {
    let rows = query("SELECT last_name FROM authors ORDER BY first_name LIMIT 2");
    assert_eq!(
        rows,
        vec![texts(&["last_name"]), texts(&["Brain"]), texts(&["Writer"])]
    );
}

#[test]
fn distinct_values() {
    assert_eq!(
        query_column("SELECT DISTINCT author_id FROM books ORDER BY author_id"),
        numbers(&[11, 12, 13, 14, 15, 99])
    );
}

#[test]
fn calculated_fields_filter_and_sort() {
    let rows = query_rows(
        "SELECT invoice, quantity * price AS total FROM sales \
         WHERE quantity * price >= 15 ORDER BY total DESC",
    );
    assert_eq!(
        rows,
        vec![
            vec![Value::from("I4"), Value::from(30)],
            vec![Value::from("I3"), Value::from(20)],
            vec![Value::from("I1"), Value::from(15)],
        ]
    );
}

#[test]
fn string_concatenation() {
    let rows = query_rows(
        "SELECT first_name + ' ' + last_name AS name, first_name || id FROM authors WHERE id = 11",
    );
    assert_eq!(rows, vec![texts(&["Ellen Writer", "Ellen11"])]);
}

#[test]
fn dates_compare_with_text() {
    assert_eq!(
        query_column("SELECT invoice FROM sales WHERE date > '2022-05-01' ORDER BY invoice"),
        texts(&["I3", "I4", "I5"])
    );
    assert_eq!(
        query_column("SELECT invoice FROM sales WHERE date = '2022-05-03'"),
        texts(&["I5"])
    );
}

#[test]
fn bind_values_follow_supply_order() {
    let rows = sql()
        .add_bind(12)
        .add_bind(14)
        .enable_column_titles(false)
        .execute("SELECT id FROM authors WHERE id = ?2 OR id = ?1 ORDER BY id")
        .unwrap();
    assert_eq!(rows, vec![numbers(&[12]), numbers(&[14])]);

    let rows = sql()
        .add_bind("Brain")
        .enable_column_titles(false)
        .execute("SELECT first_name FROM authors WHERE last_name = ?")
        .unwrap();
    assert_eq!(rows, vec![texts(&["Donald"])]);
}

#[test]
fn titles_with_spaces_normalize() {
    let people = Table::new(
        "people",
        vec![
            vec!["First Name".into(), "Age".into()],
            vec!["Ann".into(), 31.into()],
        ],
    )
    .unwrap();
    let rows = Sql::new()
        .add_table(people)
        .execute("SELECT first_name, AGE FROM PEOPLE")
        .unwrap();
    assert_eq!(
        rows,
        vec![
            texts(&["first_name", "AGE"]),
            vec![Value::from("Ann"), Value::from(31)],
        ]
    );
}

#[test]
fn tables_without_titles_use_column_letters() {
    let grid = Table::without_titles(
        "grid",
        vec![vec![1.into(), "one".into()], vec![2.into(), "two".into()]],
    )
    .unwrap();
    let rows = Sql::new()
        .add_table(grid)
        .enable_column_titles(false)
        .execute("SELECT B FROM grid WHERE A = 2")
        .unwrap();
    assert_eq!(rows, vec![texts(&["two"])]);
}

#[test]
fn order_by_calculated_key_over_text_cells() {
    let rows = query_rows("SELECT item, qty * 2 AS doubled FROM stock ORDER BY doubled");
    assert_eq!(rows.len(), 60);
    let doubled: Vec<f64> = rows.iter().filter_map(|row| row[1].as_number()).collect();
    assert_eq!(doubled.len(), 60);
    // Numbers ascend, then every NaN from the text cells.
    assert!(doubled[..48].windows(2).all(|w| w[0] < w[1]));
    assert_eq!(doubled[0], 2.0);
    assert_eq!(doubled[47], 118.0);
    assert!(doubled[48..].iter().all(|d| d.is_nan()));
}

#[test]
fn order_by_mixed_column_puts_numbers_before_text() {
    let rows = query_column("SELECT qty FROM stock ORDER BY qty DESC LIMIT 13");
    assert!(rows[..12].iter().all(|v| *v == Value::from("n/a")));
    assert_eq!(rows[12], Value::from(59));
}
