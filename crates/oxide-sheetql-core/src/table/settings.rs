//! Table settings and the loader boundary.

use serde::{Deserialize, Serialize};

use super::{Table, TableMap};
use crate::error::{Result, SheetqlError};
use crate::value::Value;

/// Default cache lifetime handed to loaders, in seconds.
pub const DEFAULT_CACHE_SECONDS: u64 = 60;

/// How to obtain one referenced table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Table name used in queries.
    pub name: String,
    /// Where the loader finds the data. Defaults to the name.
    #[serde(default)]
    pub location: String,
    /// How long the loader may cache the data.
    #[serde(default = "default_cache_seconds")]
    pub cache_seconds: u64,
    /// Whether the first row holds column titles.
    #[serde(default = "default_has_column_titles")]
    pub has_column_titles: bool,
}

const fn default_cache_seconds() -> u64 {
    DEFAULT_CACHE_SECONDS
}

const fn default_has_column_titles() -> bool {
    true
}

impl TableSettings {
    /// Settings with every default applied.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            location: name.clone(),
            name,
            cache_seconds: DEFAULT_CACHE_SECONDS,
            has_column_titles: true,
        }
    }

    /// Parses `[name, location, cache_seconds, has_column_titles]` tuples.
    /// Trailing entries may be omitted or empty.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error for tuples of arity 0 or above 4,
    /// an empty name, or a malformed cache time.
    pub fn parse_list(rows: &[Vec<Value>]) -> Result<Vec<Self>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| Self::parse_tuple(i, row))
            .collect()
    }

    fn parse_tuple(position: usize, row: &[Value]) -> Result<Self> {
        if row.is_empty() || row.len() > 4 {
            return Err(SheetqlError::Config(format!(
                "table setting {} has {} entries, expected 1 to 4",
                position + 1,
                row.len()
            )));
        }
        let name = row[0].to_string().trim().to_string();
        if name.is_empty() {
            return Err(SheetqlError::Config(format!(
                "table setting {} has no table name",
                position + 1
            )));
        }
        let mut settings = Self::new(name);

        if let Some(location) = row.get(1).filter(|v| !v.is_null()) {
            settings.location = location.to_string();
        }
        if let Some(cache) = row.get(2).filter(|v| !v.is_null()) {
            let seconds = cache.as_number().filter(|n| *n >= 0.0).ok_or_else(|| {
                SheetqlError::Config(format!(
                    "table setting {}: cache seconds must be a non-negative number, got {cache}",
                    position + 1
                ))
            })?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let seconds = seconds as u64;
            settings.cache_seconds = seconds;
        }
        if let Some(flag) = row.get(3).filter(|v| !v.is_null()) {
            settings.has_column_titles = match flag {
                Value::Boolean(b) => *b,
                other => !matches!(
                    other.to_string().trim().to_ascii_lowercase().as_str(),
                    "false" | "0" | "no"
                ),
            };
        }
        Ok(settings)
    }

    /// Location with the name as fallback for deserialized settings that
    /// left it blank.
    #[must_use]
    pub fn location(&self) -> &str {
        if self.location.is_empty() {
            &self.name
        } else {
            &self.location
        }
    }
}

/// Supplies raw rows for a table. Implementations own any caching and
/// locking; the engine never calls a loader during a query.
pub trait TableLoader {
    /// Returns the table's rows, the title row first when
    /// `settings.has_column_titles` is set.
    ///
    /// # Errors
    ///
    /// Implementations report their own failures.
    fn load(&self, settings: &TableSettings) -> Result<Vec<Vec<Value>>>;
}

/// Loads every configured table into a [`TableMap`].
///
/// # Errors
///
/// Propagates loader failures and schema errors of the loaded titles.
pub fn load_tables<L: TableLoader + ?Sized>(
    loader: &L,
    settings: &[TableSettings],
) -> Result<TableMap> {
    let mut tables = TableMap::new();
    for setting in settings {
        let rows = loader.load(setting)?;
        let table = if setting.has_column_titles {
            Table::new(setting.name.clone(), rows)?
        } else {
            Table::without_titles(setting.name.clone(), rows)?
        };
        tracing::debug!(
            table = %setting.name,
            location = %setting.location(),
            rows = table.len(),
            "loaded table"
        );
        tables.insert(table);
    }
    Ok(tables)
}
