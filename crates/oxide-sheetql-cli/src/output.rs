//! Result rendering.

use clap::ValueEnum;

use oxide_sheetql_core::{ResultSet, Value};

/// Output format of query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Aligned text columns.
    #[default]
    Table,
    /// A JSON array of row arrays.
    Json,
}

/// Renders a result set. With `titles` the first row holds the column
/// titles; an empty result renders as a single empty cell.
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn render(result: &ResultSet, format: Format, titles: bool) -> serde_json::Result<String> {
    let rows = result.to_rows(titles);
    match format {
        Format::Json => serde_json::to_string_pretty(&rows),
        Format::Table => Ok(render_table(&rows, titles && !result.titles.is_empty())),
    }
}

fn render_table(rows: &[Vec<Value>], has_title_row: bool) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();
    let width = cells.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..width)
        .map(|col| {
            cells
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for (i, row) in cells.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect();
        out.push_str(line.join(" | ").trim_end());
        out.push('\n');
        if i == 0 && has_title_row {
            let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
            out.push_str(&rule.join("-+-"));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "title".into()],
            vec![
                vec![1.into(), "Oranges".into()],
                vec![12.into(), Value::Null],
            ],
        )
    }

    #[test]
    fn test_table_format() {
        let text = render(&result(), Format::Table, true).unwrap();
        assert_eq!(
            text,
            "id | title\n---+--------\n1  | Oranges\n12 |\n"
        );
    }

    #[test]
    fn test_table_without_titles() {
        let text = render(&result(), Format::Table, false).unwrap();
        assert_eq!(text, "1  | Oranges\n12 |\n");
    }

    #[test]
    fn test_json_format() {
        let text = render(&result(), Format::Json, true).unwrap();
        let parsed: Vec<Vec<serde_json::Value>> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0][1], "title");
        assert_eq!(parsed[1][0], 1.0);
        assert!(parsed[2][1].is_null());
    }

    #[test]
    fn test_empty_result_is_one_empty_cell() {
        let empty = ResultSet::default();
        assert_eq!(render(&empty, Format::Table, true).unwrap(), "\n");
        assert_eq!(render(&empty, Format::Json, true).unwrap(), "[\n  [\n    null\n  ]\n]");
    }
}
