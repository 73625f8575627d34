//! # oxide-sheetql-core
//!
//! An embedded SQL `SELECT` engine over in-memory tables of spreadsheet
//! cells.
//!
//! This crate provides:
//! - A hand-written lexer and recursive descent parser with Pratt
//!   expression parsing
//! - Inner, left, right and full joins over equality conditions
//! - Grouping with `SUM`, `COUNT`, `MIN`, `MAX` and `AVG`, `HAVING` and `PIVOT`
//! - Scalar, `IN`, `EXISTS` and correlated subqueries
//! - `UNION`, `UNION ALL`, `INTERSECT` and `EXCEPT`
//! - Bind variables (`?1`, `?2`, …)
//!
//! ## Running a query
//!
//! ```rust
//! use oxide_sheetql_core::{Sql, Value};
//!
//! let sql = Sql::new()
//!     .add_table_data(
//!         "books",
//!         vec![
//!             vec!["id".into(), "title".into(), "author_id".into()],
//!             vec![1.into(), "A".into(), 11.into()],
//!         ],
//!     )
//!     .unwrap()
//!     .add_table_data(
//!         "authors",
//!         vec![
//!             vec!["id".into(), "first_name".into(), "last_name".into()],
//!             vec![11.into(), "X".into(), "Writer".into()],
//!         ],
//!     )
//!     .unwrap();
//!
//! let rows = sql
//!     .execute(
//!         "SELECT books.id, books.title, authors.last_name FROM books \
//!          INNER JOIN authors ON books.author_id = authors.id ORDER BY books.id",
//!     )
//!     .unwrap();
//!
//! assert_eq!(rows[1], vec![Value::from(1), Value::from("A"), Value::from("Writer")]);
//! ```
//!
//! ## Loading tables
//!
//! The engine never reads storage itself. Implement [`TableLoader`] and
//! hand the settings of the referenced tables to [`load_tables`].

pub mod ast;
pub mod bind;
pub mod error;
pub mod eval;
pub mod executor;
pub mod fields;
pub mod join;
pub mod lexer;
pub mod parser;
pub mod sql;
pub mod table;
pub mod value;

pub use ast::{Condition, Expr, SelectStatement};
pub use bind::BindData;
pub use error::{Result, SheetqlError};
pub use executor::{QueryContext, ResultSet};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse, ParseError, Parser};
pub use sql::{execute, execute_statement, Sql};
pub use table::{load_tables, Schema, Table, TableLoader, TableMap, TableSettings};
pub use value::Value;
