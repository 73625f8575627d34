//! Correlated subqueries.
//!
//! A subquery is correlated when one of its columns resolves in none of
//! its own sources but does resolve in the table of the enclosing
//! statement. Binding replaces each such column by the outer row's value,
//! leaving a self-contained statement that runs like any other.

use crate::ast::{Condition, Expr, Literal, SelectStatement, TableSource};
use crate::fields::column_spelling;
use crate::table::{normalize_name, Schema, Table, TableMap};

use super::SUBQUERY_NAME;

/// Returns true if `query` references columns of `outer`.
pub(crate) fn is_correlated(tables: &TableMap, query: &SelectStatement, outer: &Table) -> bool {
    let mut query = query.clone();
    let mut binder = Binder::new(tables, outer, None);
    binder.statement(&mut query);
    binder.replaced > 0
}

/// Returns a copy of `query` with every outer column replaced by its value
/// in `row` of `outer`.
pub(crate) fn bind_outer(
    tables: &TableMap,
    query: &SelectStatement,
    outer: &Table,
    row: usize,
) -> SelectStatement {
    let mut query = query.clone();
    let mut binder = Binder::new(tables, outer, Some(row));
    binder.statement(&mut query);
    tracing::trace!(row, replaced = binder.replaced, "bound correlated subquery");
    query
}

struct Binder<'t> {
    tables: &'t TableMap,
    outer: &'t Table,
    row: Option<usize>,
    /// Column spellings visible in each enclosing nested statement.
    scopes: Vec<Vec<Schema>>,
    replaced: usize,
}

impl<'t> Binder<'t> {
    const fn new(tables: &'t TableMap, outer: &'t Table, row: Option<usize>) -> Self {
        Self {
            tables,
            outer,
            row,
            scopes: Vec::new(),
            replaced: 0,
        }
    }

    fn statement(&mut self, query: &mut SelectStatement) {
        let mut scope = vec![self.source_schema(&query.from)];
        scope.extend(query.joins.iter().map(|join| self.source_schema(&join.source)));
        scope.push(Schema::from_spellings(
            query
                .fields
                .iter()
                .filter_map(|field| field.alias.as_deref())
                .map(|alias| (alias, 0)),
        ));
        self.scopes.push(scope);

        if let TableSource::Subquery { query: inner, .. } = &mut query.from {
            self.statement(inner);
        }
        for join in &mut query.joins {
            if let TableSource::Subquery { query: inner, .. } = &mut join.source {
                self.statement(inner);
            }
            self.condition(&mut join.condition);
        }
        for field in &mut query.fields {
            self.expr(&mut field.expr);
        }
        if let Some(condition) = &mut query.where_clause {
            self.condition(condition);
        }
        query.group_by.iter_mut().for_each(|e| self.expr(e));
        if let Some(condition) = &mut query.having {
            self.condition(condition);
        }
        query.order_by.iter_mut().for_each(|o| self.expr(&mut o.expr));
        if let Some(pivot) = &mut query.pivot {
            self.expr(pivot);
        }
        self.scopes.pop();

        for operation in &mut query.set_operations {
            self.statement(&mut operation.statement);
        }
    }

    fn condition(&mut self, condition: &mut Condition) {
        match condition {
            Condition::Compare { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Condition::Logic { terms, .. } => terms.iter_mut().for_each(|t| self.condition(t)),
            Condition::Not(inner) => self.condition(inner),
            Condition::Exists { query, .. } => self.statement(query),
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        if let Expr::Column { table, name } = &*expr {
            let spelling = column_spelling(table.as_deref(), name);
            if let Some(value) = self.outer_value(&spelling) {
                *expr = Expr::Literal(value);
            }
            return;
        }
        match expr {
            Expr::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Unary { operand, .. } | Expr::Paren(operand) => self.expr(operand),
            Expr::Function(call) => call.args.iter_mut().for_each(|a| self.expr(a)),
            Expr::List(items) => items.iter_mut().for_each(|a| self.expr(a)),
            Expr::Case {
                branches,
                else_result,
            } => {
                for (condition, result) in branches {
                    self.condition(condition);
                    self.expr(result);
                }
                if let Some(e) = else_result {
                    self.expr(e);
                }
            }
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                self.condition(condition);
                self.expr(then);
                self.expr(otherwise);
            }
            Expr::Subquery(query) => self.statement(query),
            Expr::Literal(_) | Expr::Column { .. } | Expr::Bind(_) | Expr::Wildcard { .. } => {}
        }
    }

    /// The literal replacing an outer column, or `None` when the column is
    /// visible in one of the nested scopes or unknown outside.
    fn outer_value(&mut self, spelling: &str) -> Option<Literal> {
        let inner = self
            .scopes
            .iter()
            .flatten()
            .any(|schema| schema.contains(spelling));
        if inner {
            return None;
        }
        let column = self.outer.column(spelling)?;
        self.replaced += 1;
        match self.row {
            Some(row) => Some(Literal::from(self.outer.value(row, column))),
            None => Some(Literal::Null),
        }
    }

    fn source_schema(&self, source: &TableSource) -> Schema {
        match source {
            TableSource::Table { name, alias } => {
                let titles = self
                    .tables
                    .get(name)
                    .map(|t| t.titles().to_vec())
                    .unwrap_or_default();
                Schema::lenient(alias.as_deref().unwrap_or(name), None, &titles)
            }
            TableSource::Subquery { query, alias } => {
                let titles = self.statement_titles(query);
                Schema::lenient(alias.as_deref().unwrap_or(SUBQUERY_NAME), None, &titles)
            }
        }
    }

    /// Output titles of a nested statement, with `*` expanded the way the
    /// executor expands it.
    fn statement_titles(&self, query: &SelectStatement) -> Vec<String> {
        let mut titles = Vec::new();
        for field in &query.fields {
            let Expr::Wildcard { table: qualifier } = &field.expr else {
                titles.push(field.title().to_string());
                continue;
            };
            let sources = std::iter::once(&query.from).chain(query.joins.iter().map(|j| &j.source));
            for source in sources {
                let reference = source.reference_name().unwrap_or(SUBQUERY_NAME);
                if qualifier
                    .as_deref()
                    .is_some_and(|q| normalize_name(q) != normalize_name(reference))
                {
                    continue;
                }
                let inner = match source {
                    TableSource::Table { name, .. } => self
                        .tables
                        .get(name)
                        .map(|t| t.titles().to_vec())
                        .unwrap_or_default(),
                    TableSource::Subquery { query, .. } => self.statement_titles(query),
                };
                titles.extend(
                    inner
                        .iter()
                        .map(|title| normalize_name(&format!("{reference}.{title}"))),
                );
            }
        }
        titles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::Value;

    fn tables() -> TableMap {
        [Table::new(
            "authors",
            vec![
                vec!["id".into(), "last_name".into()],
                vec![11.into(), "Writer".into()],
            ],
        )
        .unwrap()]
        .into_iter()
        .collect()
    }

    fn books() -> Table {
        Table::new(
            "books",
            vec![
                vec!["id".into(), "author_id".into()],
                vec![1.into(), 11.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_detects_outer_reference() {
        let correlated =
            parse("SELECT last_name FROM authors WHERE authors.id = books.author_id").unwrap();
        let plain = parse("SELECT last_name FROM authors WHERE id = 11").unwrap();
        assert!(is_correlated(&tables(), &correlated, &books()));
        assert!(!is_correlated(&tables(), &plain, &books()));
    }

    #[test]
    fn test_inner_columns_shadow_outer() {
        // `id` exists in both; the nested source wins.
        let query = parse("SELECT last_name FROM authors WHERE id = 11").unwrap();
        assert!(!is_correlated(&tables(), &query, &books()));
        let aliased = parse("SELECT a.last_name FROM authors AS a WHERE a.id = author_id").unwrap();
        assert!(is_correlated(&tables(), &aliased, &books()));
    }

    #[test]
    fn test_binds_row_value() {
        let query =
            parse("SELECT last_name FROM authors WHERE authors.id = books.author_id").unwrap();
        let bound = bind_outer(&tables(), &query, &books(), 0);
        let Some(Condition::Compare { right, .. }) = &bound.where_clause else {
            panic!("expected a comparison");
        };
        assert_eq!(right, &Expr::Literal(Literal::from(&Value::from(11))));
    }
}
