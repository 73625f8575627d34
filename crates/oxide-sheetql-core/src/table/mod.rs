//! In-memory tables.
//!
//! A [`Table`] owns a title row, shared row data and the [`Schema`] built
//! from the titles. Row ids are zero-based positions in the data rows; the
//! title row is never eligible.

mod schema;
mod settings;

use std::collections::HashMap;
use std::sync::Arc;

pub use schema::{normalize_name, Schema};
pub use settings::{load_tables, TableLoader, TableSettings};

use crate::error::{Result, SheetqlError};
use crate::value::Value;

/// Spreadsheet column letter for a zero-based index: `A`, …, `Z`, `AA`, …
#[must_use]
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A named table of cell values.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    alias: Option<String>,
    titles: Vec<String>,
    rows: Arc<Vec<Vec<Value>>>,
    schema: Schema,
    /// Equality indexes: column -> key -> row ids.
    indexes: HashMap<usize, HashMap<String, Vec<usize>>>,
}

impl Table {
    /// Creates a table whose first row holds the column titles.
    ///
    /// # Errors
    ///
    /// Fails when a title is empty or duplicated.
    pub fn new(name: impl Into<String>, mut rows: Vec<Vec<Value>>) -> Result<Self> {
        let titles: Vec<String> = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0).iter().map(Value::to_string).collect()
        };
        Self::from_parts(name, titles, rows)
    }

    /// Creates a table from data rows only; titles are the spreadsheet
    /// column letters.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed input; kept fallible for symmetry with
    /// [`Table::new`].
    pub fn without_titles(name: impl Into<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let titles = (0..width).map(column_letter).collect();
        Self::from_parts(name, titles, rows)
    }

    /// Creates a table from explicit titles and data rows. Rows are padded
    /// with nulls or truncated to the title width.
    ///
    /// # Errors
    ///
    /// Fails when a title is empty or duplicated.
    pub fn from_parts(
        name: impl Into<String>,
        titles: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let name = name.into();
        let schema = Schema::new(&name, None, &titles)?;
        let rows = fit_rows(rows, titles.len());
        Ok(Self {
            name,
            alias: None,
            titles,
            rows: Arc::new(rows),
            schema,
            indexes: HashMap::new(),
        })
    }

    /// Creates a table from a query result. Duplicate titles are allowed;
    /// the first spelling wins.
    #[must_use]
    pub fn derived(name: impl Into<String>, titles: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let name = name.into();
        let schema = Schema::lenient(&name, None, &titles);
        let rows = fit_rows(rows, titles.len());
        Self {
            name,
            alias: None,
            titles,
            rows: Arc::new(rows),
            schema,
            indexes: HashMap::new(),
        }
    }

    /// Creates a table with an explicit schema.
    #[must_use]
    pub fn with_schema(
        name: impl Into<String>,
        titles: Vec<String>,
        rows: Vec<Vec<Value>>,
        schema: Schema,
    ) -> Self {
        let rows = fit_rows(rows, titles.len());
        Self {
            name: name.into(),
            alias: None,
            titles,
            rows: Arc::new(rows),
            schema,
            indexes: HashMap::new(),
        }
    }

    /// Returns a copy of this table known under `alias` as well. Row data is
    /// shared.
    #[must_use]
    pub fn with_alias(&self, alias: Option<&str>) -> Self {
        let mut table = self.clone();
        table.alias = alias.map(str::to_string);
        table.schema = Schema::lenient(&self.name, alias, &self.titles);
        table
    }

    /// The table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The alias, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The name columns are qualified with: the alias when set, otherwise
    /// the table name.
    #[must_use]
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Column titles as authored.
    #[must_use]
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// The schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Data rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.titles.len()
    }

    /// Returns the column index for any spelling of a column name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.schema.column(name)
    }

    /// Returns a cell, or `Null` when out of range.
    #[must_use]
    pub fn value(&self, row: usize, column: usize) -> &Value {
        const NULL: &Value = &Value::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(NULL)
    }

    /// Builds an equality index over a column, keyed by the string cast of
    /// each cell. Null cells are not indexed.
    pub fn add_index(&mut self, column: usize) {
        if self.indexes.contains_key(&column) {
            return;
        }
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (id, row) in self.rows.iter().enumerate() {
            if let Some(value) = row.get(column) {
                if !value.is_null() {
                    index.entry(value.to_key()).or_default().push(id);
                }
            }
        }
        self.indexes.insert(column, index);
    }

    /// Row ids whose cell in `column` equals `value`. Empty when the column
    /// has no index or nothing matches.
    #[must_use]
    pub fn search(&self, column: usize, value: &Value) -> &[usize] {
        if value.is_null() {
            return &[];
        }
        self.indexes
            .get(&column)
            .and_then(|index| index.get(&value.to_key()))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Appends the rows of `other`, reordering its columns to match this
    /// table's titles. Repeated titles are matched by occurrence.
    ///
    /// # Errors
    ///
    /// Fails when `other` lacks one of this table's titles.
    pub fn concat(&mut self, other: &Self) -> Result<()> {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, title) in other.titles.iter().enumerate().rev() {
            positions
                .entry(normalize_name(title))
                .or_default()
                .push(index);
        }
        let mut mapping = Vec::with_capacity(self.titles.len());
        for title in &self.titles {
            let index = positions
                .get_mut(&normalize_name(title))
                .and_then(Vec::pop)
                .ok_or_else(|| {
                    SheetqlError::schema(format!(
                        "cannot append table {}: column {title} is missing",
                        other.name
                    ))
                })?;
            mapping.push(index);
        }

        let rows = Arc::make_mut(&mut self.rows);
        for row in other.rows.iter() {
            rows.push(
                mapping
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect(),
            );
        }
        self.indexes.clear();
        Ok(())
    }
}

fn fit_rows(mut rows: Vec<Vec<Value>>, width: usize) -> Vec<Vec<Value>> {
    for row in &mut rows {
        row.resize(width, Value::Null);
    }
    rows
}

/// Tables addressable by name, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TableMap {
    tables: HashMap<String, Table>,
}

impl TableMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table under its own name.
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(normalize_name(table.name()), table);
    }

    /// Looks a table up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(&normalize_name(name))
    }

    /// Looks a table up by name, failing with a schema error naming it.
    ///
    /// # Errors
    ///
    /// Fails when no table has that name.
    pub fn require(&self, name: &str) -> Result<&Table> {
        self.get(name)
            .ok_or_else(|| SheetqlError::schema(format!("unknown table {name}")))
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the map holds no table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<Table> for TableMap {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut map = Self::new();
        for table in iter {
            map.insert(table);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books() -> Table {
        Table::new(
            "books",
            vec![
                vec!["id".into(), "title".into(), "author_id".into()],
                vec![1.into(), "A".into(), 11.into()],
                vec![2.into(), "B".into(), 11.into()],
                vec![3.into(), "C".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = books();
        assert_eq!(table.len(), 3);
        assert_eq!(table.value(2, 2), &Value::Null);
    }

    #[test]
    fn test_without_titles_uses_letters() {
        let table = Table::without_titles("t", vec![vec![1.into(), 2.into()]]).unwrap();
        assert_eq!(table.titles(), ["A", "B"]);
        assert_eq!(table.column("t.b"), Some(1));
    }

    #[test]
    fn test_index_and_search() {
        let mut table = books();
        let author = table.column("author_id").unwrap();
        assert!(table.search(author, &Value::from(11)).is_empty());
        table.add_index(author);
        assert_eq!(table.search(author, &Value::from(11)), &[0, 1]);
        assert_eq!(table.search(author, &Value::from("11")), &[0, 1]);
        assert!(table.search(author, &Value::Null).is_empty());
    }

    #[test]
    fn test_alias_spellings() {
        let table = books().with_alias(Some("b"));
        assert_eq!(table.column("b.title"), Some(1));
        assert_eq!(table.column("books.title"), Some(1));
        assert_eq!(table.reference_name(), "b");
    }

    #[test]
    fn test_concat_reorders_columns() {
        let mut left = Table::from_parts(
            "l",
            vec!["a".into(), "b".into()],
            vec![vec![1.into(), 2.into()]],
        )
        .unwrap();
        let right = Table::from_parts(
            "r",
            vec!["B".into(), "A".into()],
            vec![vec![20.into(), 10.into()]],
        )
        .unwrap();
        left.concat(&right).unwrap();
        assert_eq!(left.rows()[1], vec![Value::from(10), Value::from(20)]);
    }

    #[test]
    fn test_table_map_is_case_insensitive() {
        let map: TableMap = [books()].into_iter().collect();
        assert!(map.get("BOOKS").is_some());
        assert!(matches!(map.require("nope"), Err(SheetqlError::Schema(_))));
    }
}
