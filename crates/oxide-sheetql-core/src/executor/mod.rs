//! Query execution.
//!
//! A [`QueryContext`] holds what one top-level query shares with its nested
//! statements: the table map and the bind values, both read-only, plus a
//! memo of subquery results. Each statement gets its own field registry
//! and derived-table chain.

pub(crate) mod correlate;
mod filter;
mod group;
mod pivot;
mod select;
mod set_ops;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::SelectStatement;
use crate::bind::BindData;
use crate::error::Result;
use crate::table::TableMap;
use crate::value::Value;

/// Table name given to materialized subqueries that have no alias.
pub(crate) const SUBQUERY_NAME: &str = "SUBQUERY";

/// Titles and data rows produced by a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub titles: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Creates a result set.
    #[must_use]
    pub const fn new(titles: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { titles, rows }
    }

    /// The first cell of the first row, or `Null`.
    #[must_use]
    pub fn scalar(&self) -> Value {
        self.rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Every value of one column.
    #[must_use]
    pub fn column(&self, index: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or_default())
            .collect()
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shapes the result for callers: the title row first when requested.
    /// A result with nothing to show is a single empty cell.
    #[must_use]
    pub fn to_rows(&self, with_titles: bool) -> Vec<Vec<Value>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        if with_titles && !self.titles.is_empty() {
            out.push(self.titles.iter().cloned().map(Value::Text).collect());
        }
        out.extend(self.rows.iter().cloned());
        if out.is_empty() {
            out.push(vec![Value::Null]);
        }
        out
    }
}

/// Shared state of one top-level query.
#[derive(Debug)]
pub struct QueryContext<'a> {
    tables: &'a TableMap,
    binds: &'a BindData,
    subqueries: RefCell<HashMap<String, Rc<ResultSet>>>,
}

impl<'a> QueryContext<'a> {
    /// Creates a context over caller-owned tables and binds.
    #[must_use]
    pub fn new(tables: &'a TableMap, binds: &'a BindData) -> Self {
        Self {
            tables,
            binds,
            subqueries: RefCell::new(HashMap::new()),
        }
    }

    /// The tables queries can reference.
    #[must_use]
    pub const fn tables(&self) -> &'a TableMap {
        self.tables
    }

    /// The bind values.
    #[must_use]
    pub const fn binds(&self) -> &'a BindData {
        self.binds
    }

    /// Runs a statement and its set operations.
    ///
    /// # Errors
    ///
    /// Propagates any error of the statement or its operands.
    pub fn run(&self, statement: &SelectStatement) -> Result<ResultSet> {
        let mut result = select::run(self, statement)?;
        for operation in &statement.set_operations {
            let right = self.run(&operation.statement)?;
            result = set_ops::combine(result, operation.operator, right)?;
        }
        Ok(result)
    }

    /// Runs a nested statement, reusing the result of an identical one.
    pub(crate) fn subquery(&self, statement: &SelectStatement) -> Result<Rc<ResultSet>> {
        let key = statement.to_string();
        if let Some(result) = self.subqueries.borrow().get(&key) {
            tracing::trace!(subquery = %key, "subquery cache hit");
            return Ok(Rc::clone(result));
        }
        let result = Rc::new(self.run(statement)?);
        self.subqueries.borrow_mut().insert(key, Rc::clone(&result));
        Ok(result)
    }

    #[cfg(test)]
    pub(crate) fn memoized_subqueries(&self) -> usize {
        self.subqueries.borrow().len()
    }
}

/// Executes a parsed statement.
///
/// # Errors
///
/// Fails with a bind error when the statement references more bind values
/// than supplied, and with any error raised while running it.
pub fn execute(
    statement: &SelectStatement,
    tables: &TableMap,
    binds: &BindData,
) -> Result<ResultSet> {
    binds.require(statement.max_bind())?;
    let ctx = QueryContext::new(tables, binds);
    let result = ctx.run(statement)?;
    tracing::debug!(
        rows = result.len(),
        columns = result.titles.len(),
        "statement executed"
    );
    Ok(result)
}
