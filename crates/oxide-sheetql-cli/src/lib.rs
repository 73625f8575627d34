//! Command-line front end for the sheetql query engine.
//!
//! Tables are JSON files holding an array of rows, each row an array of
//! cells. They are registered either one by one with `--table NAME=PATH` or
//! through a settings file of `[name, location, cache_seconds,
//! has_column_titles]` tuples.
//!
//! # CLI Usage
//!
//! ```bash
//! # Query a single table
//! oxide-sheetql -t books=books.json "SELECT title FROM books WHERE id = ?1" -b 2
//!
//! # Join two tables, one of them without a title row
//! oxide-sheetql -t books=books.json -t raw=raw.json:no-titles \
//!     "SELECT books.title, raw.B FROM books INNER JOIN raw ON books.id = raw.A"
//!
//! # Tables from a settings file, JSON output
//! oxide-sheetql --settings tables.json --format json -f report.sql
//! ```

pub mod loader;
pub mod output;

pub use loader::{parse_table_arg, read_settings, JsonFileLoader};
pub use output::{render, Format};
