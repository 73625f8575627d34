//! Query entry points.
//!
//! ```rust
//! use oxide_sheetql_core::{Sql, Value};
//!
//! let rows = Sql::new()
//!     .add_table_data(
//!         "books",
//!         vec![
//!             vec!["id".into(), "title".into()],
//!             vec![1.into(), "Dune".into()],
//!             vec![2.into(), "Emma".into()],
//!         ],
//!     )
//!     .unwrap()
//!     .add_bind(2)
//!     .execute("SELECT title FROM books WHERE id = ?1")
//!     .unwrap();
//!
//! assert_eq!(rows, vec![vec![Value::from("title")], vec![Value::from("Emma")]]);
//! ```

use crate::ast::SelectStatement;
use crate::bind::BindData;
use crate::error::Result;
use crate::executor::{self, ResultSet};
use crate::parser::parse;
use crate::table::{Table, TableMap};
use crate::value::Value;

/// Query builder holding tables, bind values and output options.
#[derive(Debug, Clone)]
pub struct Sql {
    tables: TableMap,
    binds: BindData,
    column_titles: bool,
}

impl Default for Sql {
    fn default() -> Self {
        Self::new()
    }
}

impl Sql {
    /// Creates a builder with no tables and column titles enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: TableMap::new(),
            binds: BindData::new(),
            column_titles: true,
        }
    }

    /// Adds a table, replacing any table of the same name.
    #[must_use]
    pub fn add_table(mut self, table: Table) -> Self {
        self.tables.insert(table);
        self
    }

    /// Adds a table from rows whose first row holds the titles.
    ///
    /// # Errors
    ///
    /// Fails when a title is empty or duplicated.
    pub fn add_table_data(self, name: &str, rows: Vec<Vec<Value>>) -> Result<Self> {
        Ok(self.add_table(Table::new(name, rows)?))
    }

    /// Appends a bind value, reachable as the next `?N`.
    #[must_use]
    pub fn add_bind(mut self, value: impl Into<Value>) -> Self {
        self.binds.add(value);
        self
    }

    /// Drops every bind value.
    #[must_use]
    pub fn clear_binds(mut self) -> Self {
        self.binds.clear();
        self
    }

    /// Whether results start with the column-title row.
    #[must_use]
    pub const fn enable_column_titles(mut self, enabled: bool) -> Self {
        self.column_titles = enabled;
        self
    }

    /// The registered tables.
    #[must_use]
    pub const fn tables(&self) -> &TableMap {
        &self.tables
    }

    /// Parses and runs a statement, returning shaped rows.
    ///
    /// # Errors
    ///
    /// Returns the first syntax, schema, join, bind or set-operation error.
    pub fn execute(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        execute(sql, &self.tables, &self.binds, self.column_titles)
    }

    /// Parses and runs a statement, returning titles and rows separately.
    ///
    /// # Errors
    ///
    /// See [`Sql::execute`].
    pub fn query(&self, sql: &str) -> Result<ResultSet> {
        executor::execute(&parse(sql)?, &self.tables, &self.binds)
    }
}

/// Parses and runs a statement against a table map.
///
/// # Errors
///
/// Returns the first syntax, schema, join, bind or set-operation error.
pub fn execute(
    sql: &str,
    tables: &TableMap,
    binds: &BindData,
    column_titles: bool,
) -> Result<Vec<Vec<Value>>> {
    let statement = parse(sql)?;
    execute_statement(&statement, tables, binds, column_titles)
}

/// Runs an already parsed statement.
///
/// # Errors
///
/// See [`execute`].
pub fn execute_statement(
    statement: &SelectStatement,
    tables: &TableMap,
    binds: &BindData,
    column_titles: bool,
) -> Result<Vec<Vec<Value>>> {
    let result = executor::execute(statement, tables, binds)?;
    Ok(result.to_rows(column_titles))
}
