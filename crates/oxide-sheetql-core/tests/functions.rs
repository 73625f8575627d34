//! Tests for calculated fields: scalar functions, CASE, IF and CONVERT.

mod common;
use common::*;

use oxide_sheetql_core::Value;

fn one(expr: &str) -> Value {
    let rows = query_rows(&format!("SELECT {expr} FROM authors WHERE id = 12"));
    rows.into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .unwrap_or_default()
}

#[test]
fn string_functions() {
    assert_eq!(one("UPPER(last_name)"), Value::from("SAVELIEVA"));
    assert_eq!(one("LOWER(first_name)"), Value::from("olga"));
    assert_eq!(one("LEFT(first_name, 2)"), Value::from("Ol"));
    assert_eq!(one("RIGHT(last_name, 3)"), Value::from("eva"));
    assert_eq!(one("LEN(last_name)"), Value::from(9));
    assert_eq!(one("SUBSTRING(last_name, 2, 3)"), Value::from("ave"));
    assert_eq!(one("REVERSE(first_name)"), Value::from("aglO"));
    assert_eq!(one("TRIM('  x  ')"), Value::from("x"));
    assert_eq!(one("CONCAT_WS('-', first_name, last_name)"), Value::from("Olga-Savelieva"));
    assert_eq!(one("CONCAT(first_name, id)"), Value::from("Olga12"));
    assert_eq!(one("CHARINDEX('v', last_name)"), Value::from(3));
    assert_eq!(one("REPLICATE('ab', 2)"), Value::from("abab"));
}

#[test]
fn numeric_functions() {
    assert_eq!(one("ABS(-id)"), Value::from(12));
    assert_eq!(one("ROUND(id / 5)"), Value::from(2));
    assert_eq!(one("FLOOR(id / 5)"), Value::from(2));
    assert_eq!(one("CEILING(id / 5)"), Value::from(3));
    assert_eq!(one("POWER(2, 3)"), Value::from(8));
    assert_eq!(one("SQRT(id + 4)"), Value::from(4));
    assert_eq!(one("id % 5"), Value::from(2));
}

#[test]
fn coalesce_and_convert() {
    assert_eq!(one("COALESCE(NULL, last_name)"), Value::from("Savelieva"));
    assert_eq!(one("CONVERT('12.7', SIGNED)"), Value::from(12));
    assert_eq!(one("CONVERT(id, CHAR)"), Value::from("12"));
}

#[test]
fn date_functions() {
    let rows = query_rows("SELECT YEAR(date), MONTH(date), DAY(date) FROM sales WHERE invoice = 'I3'");
    assert_eq!(rows, vec![numbers(&[2022, 5, 2])]);
}

#[test]
fn case_expressions() {
    let rows = query_rows(
        "SELECT invoice, CASE WHEN quantity >= 5 THEN 'bulk' ELSE 'single' END AS size, \
         CASE customer_id WHEN 'C1' THEN 'regular' END AS tag \
         FROM sales ORDER BY invoice LIMIT 2",
    );
    assert_eq!(
        rows,
        vec![
            texts(&["I1", "bulk", "regular"]),
            vec![Value::from("I2"), Value::from("bulk"), Value::Null],
        ]
    );
}

#[test]
fn if_function() {
    assert_eq!(
        query_column(
            "SELECT IF(quantity > 5, 'many', 'few') FROM sales ORDER BY invoice"
        ),
        texts(&["many", "few", "few", "few", "many"])
    );
}

#[test]
fn calculated_field_repeated_across_clauses() {
    let rows = query_rows(
        "SELECT customer_id, quantity * price FROM sales WHERE quantity * price > 10 \
         ORDER BY quantity * price",
    );
    assert_eq!(
        rows,
        vec![
            vec![Value::from("C1"), Value::from(15)],
            vec![Value::from("C1"), Value::from(20)],
            vec![Value::from("C1"), Value::from(30)],
        ]
    );
}

#[test]
fn huge_string_counts() {
    assert_eq!(one("STUFF(first_name, 2, POWER(10, 30), 'x')"), Value::from("Ox"));
    assert_eq!(one("REPLICATE('ab', POWER(10, 19))"), Value::Null);
    assert_eq!(one("LEN(SPACE(POWER(10, 30)))"), Value::from(0));
}
