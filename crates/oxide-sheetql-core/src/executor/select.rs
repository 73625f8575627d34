//! The per-statement pipeline: sources, fields, joins, `WHERE`, row
//! materialization, grouping, `HAVING`, `ORDER BY`, hidden-column removal
//! and `LIMIT`.

use std::cmp::Ordering;

use crate::ast::{Condition, Expr, OrderDirection, SelectStatement, TableSource};
use crate::error::Result;
use crate::eval::Evaluator;
use crate::fields::TableFields;
use crate::join;
use crate::table::Table;
use crate::value::Value;

use super::{filter, group, pivot, QueryContext, ResultSet, SUBQUERY_NAME};

/// Runs one statement, ignoring its set operations.
pub(super) fn run(ctx: &QueryContext<'_>, statement: &SelectStatement) -> Result<ResultSet> {
    if statement.pivot.is_some() {
        let expanded = pivot::expand(ctx, statement)?;
        return run_plain(ctx, &expanded);
    }
    run_plain(ctx, statement)
}

fn run_plain(ctx: &QueryContext<'_>, statement: &SelectStatement) -> Result<ResultSet> {
    let mut sources = Vec::with_capacity(statement.joins.len() + 1);
    sources.push(materialize(ctx, &statement.from)?);
    for join in &statement.joins {
        sources.push(materialize(ctx, &join.source)?);
    }

    let mut fields = TableFields::from_select(&statement.fields, &sources)?;
    let group_keys = statement
        .group_by
        .iter()
        .map(|expr| fields.resolve_or_add(expr, &sources, "GROUP BY"))
        .collect::<Result<Vec<_>>>()?;
    if let Some(having) = &statement.having {
        for expr in having_references(having) {
            fields.resolve_or_add(&expr, &sources, "HAVING")?;
        }
    }
    let order_keys = statement
        .order_by
        .iter()
        .map(|order| {
            fields
                .resolve_or_add(&order.expr, &sources, "ORDER BY")
                .map(|slot| (slot, order.direction))
        })
        .collect::<Result<Vec<_>>>()?;

    let working = join::join_all(ctx, &sources, &statement.joins, &mut fields)?;
    let evaluator = Evaluator::new(ctx, &working);
    let ids = filter::matching_rows(&evaluator, statement.where_clause.as_ref())?;

    let nodes = fields
        .iter()
        .map(|field| evaluator.compile_field(field))
        .collect::<Result<Vec<_>>>()?;
    let mut rows = Vec::with_capacity(ids.len());
    for &id in &ids {
        rows.push(
            nodes
                .iter()
                .map(|node| evaluator.eval(node, id))
                .collect::<Result<Vec<_>>>()?,
        );
    }

    rows = group::apply(&fields, &group_keys, statement.distinct, rows);
    if let Some(having) = &statement.having {
        rows = filter::having(ctx, &fields, rows, having)?;
    }
    if !order_keys.is_empty() {
        rows.sort_by(|a, b| compare_rows(&order_keys, a, b));
    }

    let selected = fields.selected_len();
    for row in &mut rows {
        row.truncate(selected);
    }
    if let Some(limit) = statement.limit {
        rows.truncate(limit);
    }

    tracing::debug!(
        source = sources.first().map_or("", Table::reference_name),
        scanned = working.len(),
        matched = ids.len(),
        rows = rows.len(),
        "select executed"
    );
    Ok(ResultSet::new(fields.titles(), rows))
}

/// Turns a `FROM` or `JOIN` operand into a table.
fn materialize(ctx: &QueryContext<'_>, source: &TableSource) -> Result<Table> {
    match source {
        TableSource::Table { name, alias } => {
            Ok(ctx.tables().require(name)?.with_alias(alias.as_deref()))
        }
        TableSource::Subquery { query, alias } => {
            let result = ctx.subquery(query)?;
            Ok(Table::derived(
                alias.as_deref().unwrap_or(SUBQUERY_NAME),
                result.titles.clone(),
                result.rows.clone(),
            ))
        }
    }
}

/// Aggregates and columns a `HAVING` condition needs as fields.
fn having_references(condition: &Condition) -> Vec<Expr> {
    let mut found = Vec::new();
    condition.walk_shallow(&mut |expr| {
        if expr.as_aggregate().is_some() || matches!(expr, Expr::Column { .. }) {
            found.push(expr.clone());
        }
    });
    found
}

fn compare_rows(keys: &[(usize, OrderDirection)], a: &[Value], b: &[Value]) -> Ordering {
    for &(slot, direction) in keys {
        let ordering = match (a.get(slot), b.get(slot)) {
            (Some(x), Some(y)) => x.sort_cmp(y),
            _ => Ordering::Equal,
        };
        let ordering = match direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
    Ordering::Equal
}
