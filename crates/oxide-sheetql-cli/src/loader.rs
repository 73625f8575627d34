//! JSON-file table loading.

use std::fs;
use std::path::Path;

use tracing::debug;

use oxide_sheetql_core::value::parse_date;
use oxide_sheetql_core::{Result, SheetqlError, TableLoader, TableSettings, Value};

const NO_TITLES_SUFFIX: &str = ":no-titles";

/// Loads a table from the JSON file named by its location.
///
/// The file holds an array of row arrays. Strings that read as dates
/// become date cells; every other cell keeps its JSON type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileLoader;

impl TableLoader for JsonFileLoader {
    fn load(&self, settings: &TableSettings) -> Result<Vec<Vec<Value>>> {
        let path = settings.location();
        let rows: Vec<Vec<Value>> = read_json(Path::new(path))?;
        debug!(table = %settings.name, path, rows = rows.len(), "read table file");
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(date_cell).collect())
            .collect())
    }
}

fn date_cell(value: Value) -> Value {
    match value {
        Value::Text(text) => parse_date(&text).map_or(Value::Text(text), Value::Date),
        other => other,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| SheetqlError::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| SheetqlError::Config(format!("invalid JSON in {}: {e}", path.display())))
}

/// Parses a `NAME=PATH[:no-titles]` table argument.
///
/// # Errors
///
/// Fails when the name or the path is missing.
pub fn parse_table_arg(arg: &str) -> std::result::Result<TableSettings, String> {
    let (name, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing table name in '{arg}'"));
    }
    let (path, has_column_titles) = path
        .strip_suffix(NO_TITLES_SUFFIX)
        .map_or((path, true), |stripped| (stripped, false));
    if path.is_empty() {
        return Err(format!("missing path in '{arg}'"));
    }

    let mut settings = TableSettings::new(name);
    settings.location = path.to_string();
    settings.has_column_titles = has_column_titles;
    Ok(settings)
}

/// Reads a settings file: a JSON array of table-settings tuples.
/// Relative locations are resolved against the file's directory.
///
/// # Errors
///
/// Fails with a configuration error when the file is unreadable, is not
/// JSON, or holds a malformed tuple.
pub fn read_settings(path: &Path) -> Result<Vec<TableSettings>> {
    let rows: Vec<Vec<Value>> = read_json(path)?;
    let mut settings = TableSettings::parse_list(&rows)?;
    if let Some(dir) = path.parent() {
        for setting in &mut settings {
            let location = Path::new(setting.location());
            if location.is_relative() {
                setting.location = dir.join(location).to_string_lossy().into_owned();
            }
        }
    }
    debug!(path = %path.display(), tables = settings.len(), "read settings file");
    Ok(settings)
}
