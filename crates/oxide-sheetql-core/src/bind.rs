//! Bind variables.

use crate::error::{Result, SheetqlError};
use crate::value::Value;

/// Values for `?` / `?N` placeholders, in the order they were supplied.
///
/// The parser numbers bare `?` markers left to right, so the N-th pushed
/// value feeds both the N-th bare marker and `?N`. The data lives for one
/// query and can be cleared and reused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindData {
    values: Vec<Value>,
}

impl BindData {
    /// Creates an empty set of binds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value and returns the name it is reachable by (`?1`, `?2`, …).
    pub fn add(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("?{}", self.values.len())
    }

    /// Returns the value for placeholder `?n` (1-based).
    ///
    /// # Errors
    ///
    /// Fails with a bind error when fewer than `n` values were supplied.
    pub fn get(&self, n: usize) -> Result<&Value> {
        n.checked_sub(1)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| {
                SheetqlError::Bind(format!(
                    "no value for ?{n}: {} bind value(s) supplied",
                    self.values.len()
                ))
            })
    }

    /// Returns the value for a placeholder spelled `?N`.
    ///
    /// # Errors
    ///
    /// Fails with a bind error for a malformed name or a missing value.
    pub fn get_named(&self, name: &str) -> Result<&Value> {
        let n = name
            .trim()
            .strip_prefix('?')
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| SheetqlError::Bind(format!("malformed bind name {name}")))?;
        self.get(n)
    }

    /// Checks that placeholders up to `?max` all have a value.
    ///
    /// # Errors
    ///
    /// Fails with a bind error naming the first missing placeholder.
    pub fn require(&self, max: usize) -> Result<()> {
        if max > self.values.len() {
            return self.get(self.values.len() + 1).map(|_| ());
        }
        Ok(())
    }

    /// Drops every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no value was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The values in supply order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl<V: Into<Value>> FromIterator<V> for BindData {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(Into::into).collect(),
        }
    }
}
