#![allow(dead_code)]

use oxide_sheetql_core::ast::SelectStatement;
use oxide_sheetql_core::{parse, SheetqlError, Sql, Table, Value};

pub fn books() -> Table {
    let rows: Vec<(i32, &str, i32)> = vec![
        (1, "Time to Grow Up!", 11),
        (2, "Your Trip", 12),
        (3, "Lovely Love", 14),
        (4, "Dream Your Life", 11),
        (5, "Oranges", 12),
        (6, "Your Happy Life", 15),
        (7, "Applied AI", 13),
        (8, "My Last Book", 11),
        (9, "Orphan", 99),
    ];
    let mut data = vec![vec!["id".into(), "title".into(), "author_id".into()]];
    data.extend(
        rows.into_iter()
            .map(|(id, title, author)| vec![id.into(), title.into(), author.into()]),
    );
    Table::new("books", data).unwrap()
}

pub fn authors() -> Table {
    let rows: Vec<(i32, &str, &str)> = vec![
        (11, "Ellen", "Writer"),
        (12, "Olga", "Savelieva"),
        (13, "Jack", "Smart"),
        (14, "Donald", "Brain"),
        (15, "Yao", "Dou"),
        (16, "Nobody", "Unpublished"),
    ];
    let mut data = vec![vec!["id".into(), "first_name".into(), "last_name".into()]];
    data.extend(
        rows.into_iter()
            .map(|(id, first, last)| vec![id.into(), first.into(), last.into()]),
    );
    Table::new("authors", data).unwrap()
}

pub fn sales() -> Table {
    let rows: Vec<(&str, u32, &str, i32, f64)> = vec![
        ("I1", 1, "C1", 10, 1.5),
        ("I2", 1, "C2", 5, 2.0),
        ("I3", 2, "C1", 2, 10.0),
        ("I4", 2, "C1", 3, 10.0),
        ("I5", 3, "C3", 7, 1.0),
    ];
    let mut data = vec![vec![
        "invoice".into(),
        "date".into(),
        "customer_id".into(),
        "quantity".into(),
        "price".into(),
    ]];
    data.extend(rows.into_iter().map(|(invoice, day, customer, quantity, price)| {
        vec![
            invoice.into(),
            Value::date(2022, 5, day),
            customer.into(),
            quantity.into(),
            price.into(),
        ]
    }));
    Table::new("sales", data).unwrap()
}

/// 60 items whose quantity is `"n/a"` on every fifth row.
pub fn stock() -> Table {
    let mut data = vec![texts(&["item", "qty"])];
    data.extend((0..60).map(|i: i32| {
        let qty = if i % 5 == 0 {
            Value::from("n/a")
        } else {
            Value::from(60 - i)
        };
        vec![Value::from(format!("item{i}")), qty]
    }));
    Table::new("stock", data).unwrap()
}

pub fn sql() -> Sql {
    Sql::new()
        .add_table(books())
        .add_table(authors())
        .add_table(sales())
        .add_table(stock())
}

/// Runs a query with the title row.
pub fn query(statement: &str) -> Vec<Vec<Value>> {
    sql()
        .execute(statement)
        .unwrap_or_else(|e| panic!("Failed to run: {statement}\nError: {e:?}"))
}

/// Runs a query without the title row.
pub fn query_rows(statement: &str) -> Vec<Vec<Value>> {
    sql()
        .enable_column_titles(false)
        .execute(statement)
        .unwrap_or_else(|e| panic!("Failed to run: {statement}\nError: {e:?}"))
}

/// First column of a query without the title row.
pub fn query_column(statement: &str) -> Vec<Value> {
    query_rows(statement)
        .into_iter()
        .map(|row| row.into_iter().next().unwrap_or_default())
        .collect()
}

pub fn query_err(statement: &str) -> SheetqlError {
    sql()
        .execute(statement)
        .expect_err(&format!("Expected an error for: {statement}"))
}

pub fn parse_select(statement: &str) -> SelectStatement {
    parse(statement).unwrap_or_else(|e| panic!("Failed to parse: {statement}\nError: {e:?}"))
}

/// Verifies that rendering a parsed statement is a fixed point.
pub fn round_trip(statement: &str) {
    let rendered1 = parse_select(statement).to_string();
    let rendered2 = parse_select(&rendered1).to_string();
    assert_eq!(
        rendered1, rendered2,
        "Round-trip failed.\n  Input:    {statement}\n  First:    {rendered1}\n  Second:   {rendered2}"
    );
}

pub fn texts(values: &[&str]) -> Vec<Value> {
    values.iter().map(|&v| Value::from(v)).collect()
}

pub fn numbers(values: &[i32]) -> Vec<Value> {
    values.iter().map(|&v| Value::from(v)).collect()
}
