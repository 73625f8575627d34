//! Field-name resolution for a table.

use std::collections::HashMap;

use crate::error::{Result, SheetqlError};

/// Normalizes a column spelling: trimmed, upper-cased, with every run of
/// whitespace replaced by a single underscore.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// Maps every known spelling of a column to its zero-based index.
///
/// For a title `First Name` of table `authors` with alias `a` the schema
/// knows `FIRST_NAME`, `AUTHORS.FIRST_NAME` and `A.FIRST_NAME`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: HashMap<String, usize>,
    /// Spellings in insertion order, so merges stay deterministic.
    order: Vec<(String, usize)>,
}

impl Schema {
    /// Builds a schema from a title row.
    ///
    /// # Errors
    ///
    /// Fails with a schema error when a title is empty or when two titles
    /// normalize to the same name.
    pub fn new(table: &str, alias: Option<&str>, titles: &[String]) -> Result<Self> {
        let mut schema = Self::default();
        for (index, title) in titles.iter().enumerate() {
            let bare = normalize_name(title);
            if bare.is_empty() {
                return Err(SheetqlError::schema(format!(
                    "column {} of table {table} has an empty title",
                    index + 1
                )));
            }
            if schema.columns.contains_key(&bare) {
                return Err(SheetqlError::schema(format!(
                    "duplicate column {title} in table {table}"
                )));
            }
            schema.add_spellings(table, alias, &bare, index);
        }
        Ok(schema)
    }

    /// Builds a schema where the first spelling wins, for tables derived
    /// from query results. Dotted titles such as `BOOKS.ID` are also
    /// reachable by their last segment.
    #[must_use]
    pub fn lenient(table: &str, alias: Option<&str>, titles: &[String]) -> Self {
        let mut schema = Self::default();
        for (index, title) in titles.iter().enumerate() {
            let bare = normalize_name(title);
            schema.add_spellings(table, alias, &bare, index);
        }
        for (index, title) in titles.iter().enumerate() {
            let bare = normalize_name(title);
            if let Some((_, column)) = bare.rsplit_once('.') {
                if column.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    let column = column.to_string();
                    schema.add_spellings(table, alias, &column, index);
                }
            }
        }
        schema
    }

    /// Builds a schema from explicit spellings; the first spelling wins.
    #[must_use]
    pub fn from_spellings<I, S>(spellings: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: AsRef<str>,
    {
        let mut schema = Self::default();
        for (spelling, index) in spellings {
            schema.insert(normalize_name(spelling.as_ref()), index);
        }
        schema
    }

    fn add_spellings(&mut self, table: &str, alias: Option<&str>, bare: &str, index: usize) {
        self.insert(bare.to_string(), index);
        if !table.is_empty() {
            self.insert(format!("{}.{bare}", normalize_name(table)), index);
        }
        if let Some(alias) = alias {
            self.insert(format!("{}.{bare}", normalize_name(alias)), index);
        }
    }

    fn insert(&mut self, spelling: String, index: usize) {
        if spelling.is_empty() || self.columns.contains_key(&spelling) {
            return;
        }
        self.columns.insert(spelling.clone(), index);
        self.order.push((spelling, index));
    }

    /// Returns the column index for any spelling of a column name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(&normalize_name(name)).copied()
    }

    /// Returns true if the spelling is known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Spellings and their indices, in insertion order.
    pub fn spellings(&self) -> impl Iterator<Item = (&str, usize)> {
        self.order.iter().map(|(s, i)| (s.as_str(), *i))
    }

    /// Union of two schemas for a derived table: `right` indices are
    /// shifted by `offset` and the first spelling wins.
    #[must_use]
    pub fn merge(left: &Self, right: &Self, offset: usize) -> Self {
        let mut schema = left.clone();
        for (spelling, index) in right.spellings() {
            schema.insert(spelling.to_string(), index + offset);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  first   name "), "FIRST_NAME");
        assert_eq!(normalize_name("books.id"), "BOOKS.ID");
    }

    #[test]
    fn test_all_spellings_resolve() {
        let schema = Schema::new("authors", Some("a"), &titles(&["id", "First Name"])).unwrap();
        assert_eq!(schema.column("first_name"), Some(1));
        assert_eq!(schema.column("authors.first name"), Some(1));
        assert_eq!(schema.column("A.ID"), Some(0));
        assert_eq!(schema.column("b.id"), None);
    }

    #[test]
    fn test_duplicate_title_is_error() {
        let err = Schema::new("t", None, &titles(&["Name", "name "])).unwrap_err();
        assert!(matches!(err, SheetqlError::Schema(_)));
    }

    #[test]
    fn test_empty_title_is_error() {
        assert!(Schema::new("t", None, &titles(&["id", "  "])).is_err());
    }

    #[test]
    fn test_lenient_reaches_dotted_suffix() {
        let schema = Schema::lenient("sub", None, &titles(&["BOOKS.ID", "title"]));
        assert_eq!(schema.column("books.id"), Some(0));
        assert_eq!(schema.column("id"), Some(0));
        assert_eq!(schema.column("sub.id"), Some(0));
    }

    #[test]
    fn test_merge_first_wins() {
        let left = Schema::new("books", None, &titles(&["id", "title"])).unwrap();
        let right = Schema::new("authors", None, &titles(&["id", "name"])).unwrap();
        let merged = Schema::merge(&left, &right, 2);
        assert_eq!(merged.column("id"), Some(0));
        assert_eq!(merged.column("authors.id"), Some(2));
        assert_eq!(merged.column("name"), Some(3));
    }
}
