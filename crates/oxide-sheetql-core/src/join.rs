//! Join engine.
//!
//! Joins run left to right. The running table starts as the `FROM` source;
//! each `JOIN` matches its rows against the new source and materializes a
//! derived table whose columns are the running table's followed by the new
//! source's. Field registry entries are re-pointed after every step.

use std::collections::HashMap;

use crate::ast::{CompareOp, Condition, Expr, JoinClause, JoinType, LogicOp};
use crate::error::{Result, SheetqlError};
use crate::eval::Evaluator;
use crate::executor::QueryContext;
use crate::fields::{column_spelling, TableFields};
use crate::table::{Schema, Table};
use crate::value::Value;

/// Name given to join results.
pub const DERIVED_NAME: &str = "DERIVED";

/// Right-row ids matched by each left row.
type Matches = Vec<Vec<usize>>;

/// Runs every join of a statement over its materialized sources.
/// `sources[0]` is the `FROM` table and `sources[n]` the n-th join operand.
///
/// # Errors
///
/// Fails with a join resolution error for conditions that are not
/// equality trees over the two sides, and propagates evaluation errors.
pub fn join_all(
    ctx: &QueryContext<'_>,
    sources: &[Table],
    joins: &[JoinClause],
    fields: &mut TableFields,
) -> Result<Table> {
    let Some(first) = sources.first() else {
        return Err(SheetqlError::Internal("statement has no source table".into()));
    };
    let mut working = first.clone();
    for (index, join) in joins.iter().enumerate() {
        let source = index + 1;
        let right = sources.get(source).ok_or_else(|| {
            SheetqlError::Internal(format!("join {source} has no materialized source"))
        })?;
        let offset = working.width();
        working = join_tables(ctx, &working, right, join)?;
        fields.repoint(source, offset);
    }
    Ok(working)
}

/// Joins two tables.
///
/// # Errors
///
/// See [`join_all`].
pub fn join_tables(
    ctx: &QueryContext<'_>,
    left: &Table,
    right: &Table,
    join: &JoinClause,
) -> Result<Table> {
    let mut right = right.clone();
    let matches = resolve(ctx, left, &mut right, &join.condition)?;
    let table = materialize(left, &right, &matches, join.join_type)?;
    tracing::debug!(
        join = join.join_type.as_str(),
        table = right.reference_name(),
        left_rows = left.len(),
        right_rows = right.len(),
        rows = table.len(),
        "join materialized"
    );
    Ok(table)
}

/// Resolves an `ON` tree into per-left-row match lists. `AND` intersects
/// the lists of each left row, `OR` unites them.
fn resolve(
    ctx: &QueryContext<'_>,
    left: &Table,
    right: &mut Table,
    condition: &Condition,
) -> Result<Matches> {
    match condition {
        Condition::Compare {
            left: a,
            op: CompareOp::Eq,
            right: b,
        } => resolve_equality(ctx, left, right, a, b),
        Condition::Logic { op, terms } => {
            let mut combined: Option<Matches> = None;
            for term in terms {
                let part = resolve(ctx, left, right, term)?;
                combined = Some(match combined {
                    None => part,
                    Some(acc) if *op == LogicOp::And => intersect(acc, part),
                    Some(acc) => unite(acc, part),
                });
            }
            Ok(combined.unwrap_or_else(|| vec![Vec::new(); left.len()]))
        }
        other => Err(SheetqlError::JoinResolution(format!(
            "unsupported join condition {other}: only equality combined with AND/OR is allowed"
        ))),
    }
}

/// Which side(s) an operand can be evaluated on.
#[derive(Debug, Clone, Copy)]
struct Sides {
    left: bool,
    right: bool,
}

impl Sides {
    /// An operand belongs to a side when every column it references
    /// resolves there. Constants belong to both.
    fn of(expr: &Expr, left: &Table, right: &Table) -> Self {
        let mut sides = Self {
            left: true,
            right: true,
        };
        expr.walk_shallow(&mut |e| {
            if let Expr::Column { table, name } = e {
                let spelling = column_spelling(table.as_deref(), name);
                sides.left &= left.column(&spelling).is_some();
                sides.right &= right.column(&spelling).is_some();
            }
        });
        sides
    }
}

fn resolve_equality(
    ctx: &QueryContext<'_>,
    left: &Table,
    right: &mut Table,
    a: &Expr,
    b: &Expr,
) -> Result<Matches> {
    let (a_sides, b_sides) = (Sides::of(a, left, right), Sides::of(b, left, right));
    let (outer, inner) = if a_sides.left && b_sides.right {
        (a, b)
    } else if b_sides.left && a_sides.right {
        (b, a)
    } else {
        return Err(SheetqlError::JoinResolution(format!(
            "cannot attribute {a} = {b} to {} and {}",
            left.reference_name(),
            right.reference_name()
        )));
    };

    let evaluator = Evaluator::new(ctx, left);
    let node = evaluator.compile(outer)?;
    let keys = (0..left.len())
        .map(|row| evaluator.eval(&node, row))
        .collect::<Result<Vec<Value>>>()?;

    if let Some(column) = plain_column(inner, right) {
        right.add_index(column);
        return Ok(keys
            .iter()
            .map(|key| right.search(column, key).to_vec())
            .collect());
    }

    let evaluator = Evaluator::new(ctx, right);
    let node = evaluator.compile(inner)?;
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..right.len() {
        let value = evaluator.eval(&node, row)?;
        if !value.is_null() {
            index.entry(value.to_key()).or_default().push(row);
        }
    }
    Ok(keys
        .iter()
        .map(|key| {
            if key.is_null() {
                Vec::new()
            } else {
                index.get(&key.to_key()).cloned().unwrap_or_default()
            }
        })
        .collect())
}

fn plain_column(expr: &Expr, table: &Table) -> Option<usize> {
    match expr {
        Expr::Column { table: qualifier, name } => {
            table.column(&column_spelling(qualifier.as_deref(), name))
        }
        Expr::Paren(inner) => plain_column(inner, table),
        _ => None,
    }
}

fn intersect(a: Matches, b: Matches) -> Matches {
    a.into_iter()
        .zip(b)
        .map(|(x, y)| x.into_iter().filter(|id| y.contains(id)).collect())
        .collect()
}

fn unite(a: Matches, b: Matches) -> Matches {
    a.into_iter()
        .zip(b)
        .map(|(mut x, y)| {
            x.extend(y);
            x.sort_unstable();
            x.dedup();
            x
        })
        .collect()
}

fn concat_row(left: &[Value], right: &[Value]) -> Vec<Value> {
    left.iter().chain(right).cloned().collect()
}

/// Builds the derived table for one join step.
fn materialize(left: &Table, right: &Table, matches: &[Vec<usize>], join_type: JoinType) -> Result<Table> {
    let titles: Vec<String> = left.titles().iter().chain(right.titles()).cloned().collect();
    let schema = Schema::merge(left.schema(), right.schema(), left.width());
    let left_nulls = vec![Value::Null; left.width()];
    let right_nulls = vec![Value::Null; right.width()];
    let mut rows = Vec::new();

    match join_type {
        JoinType::Inner | JoinType::Left | JoinType::Full => {
            for (l, ids) in matches.iter().enumerate() {
                let left_row = &left.rows()[l];
                if ids.is_empty() && join_type != JoinType::Inner {
                    rows.push(concat_row(left_row, &right_nulls));
                }
                for &r in ids {
                    rows.push(concat_row(left_row, &right.rows()[r]));
                }
            }
        }
        JoinType::Right => {
            let mut by_right = vec![Vec::new(); right.len()];
            for (l, ids) in matches.iter().enumerate() {
                for &r in ids {
                    by_right[r].push(l);
                }
            }
            for (r, lefts) in by_right.iter().enumerate() {
                let right_row = &right.rows()[r];
                if lefts.is_empty() {
                    rows.push(concat_row(&left_nulls, right_row));
                }
                for &l in lefts {
                    rows.push(concat_row(&left.rows()[l], right_row));
                }
            }
        }
    }

    let mut table = Table::with_schema(DERIVED_NAME, titles.clone(), rows, schema.clone());
    if join_type == JoinType::Full {
        let mut matched = vec![false; right.len()];
        for &r in matches.iter().flatten() {
            matched[r] = true;
        }
        let unmatched: Vec<Vec<Value>> = right
            .rows()
            .iter()
            .zip(&matched)
            .filter(|(_, hit)| !**hit)
            .map(|(row, _)| concat_row(&left_nulls, row))
            .collect();
        if !unmatched.is_empty() {
            let outer = Table::with_schema(DERIVED_NAME, titles, unmatched, schema);
            table.concat(&outer)?;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BindData;
    use crate::parser::Parser;
    use crate::table::TableMap;

    fn books() -> Table {
        Table::new(
            "books",
            vec![
                vec!["id".into(), "title".into(), "author_id".into()],
                vec![1.into(), "A".into(), 11.into()],
                vec![2.into(), "B".into(), 12.into()],
                vec![3.into(), "C".into(), 99.into()],
                vec![4.into(), "D".into(), 11.into()],
            ],
        )
        .unwrap()
        .with_alias(None)
    }

    fn authors() -> Table {
        Table::new(
            "authors",
            vec![
                vec!["id".into(), "last_name".into()],
                vec![11.into(), "Writer".into()],
                vec![12.into(), "Smith".into()],
                vec![13.into(), "Nobody".into()],
            ],
        )
        .unwrap()
        .with_alias(None)
    }

    fn join(on: &str, join_type: JoinType) -> Result<Table> {
        let tables = TableMap::new();
        let binds = BindData::new();
        let ctx = QueryContext::new(&tables, &binds);
        let clause = JoinClause {
            join_type,
            source: crate::ast::TableSource::table("authors"),
            condition: Parser::new(on).parse_condition().unwrap(),
        };
        join_tables(&ctx, &books(), &authors(), &clause)
    }

    const ON: &str = "books.author_id = authors.id";

    #[test]
    fn test_inner_join() {
        let table = join(ON, JoinType::Inner).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.titles(), ["id", "title", "author_id", "id", "last_name"]);
        assert_eq!(table.value(1, 4), &Value::from("Smith"));
        assert_eq!(table.column("authors.id"), Some(3));
        assert_eq!(table.column("id"), Some(0));
    }

    #[test]
    fn test_reversed_operands_are_swapped() {
        let table = join("authors.id = books.author_id", JoinType::Inner).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_outer_join_counts() {
        let inner = join(ON, JoinType::Inner).unwrap().len();
        let left = join(ON, JoinType::Left).unwrap();
        let right = join(ON, JoinType::Right).unwrap();
        let full = join(ON, JoinType::Full).unwrap();
        assert_eq!(left.len(), 4);
        assert_eq!(left.value(2, 4), &Value::Null);
        assert_eq!(right.len(), inner + 1);
        assert_eq!(right.value(3, 0), &Value::Null);
        assert_eq!(right.value(3, 4), &Value::from("Nobody"));
        assert_eq!(full.len(), 5);
        assert_eq!(full.value(4, 4), &Value::from("Nobody"));
    }

    #[test]
    fn test_calculated_operand() {
        let table = join("books.author_id - 1 = authors.id", JoinType::Inner).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, 1), &Value::from("B"));
    }

    #[test]
    fn test_and_or_conditions() {
        let both = join(
            "books.author_id = authors.id AND books.title = 'A'",
            JoinType::Inner,
        )
        .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both.value(0, 4), &Value::from("Writer"));

        let either = join(
            "books.author_id = authors.id OR books.id = authors.id",
            JoinType::Inner,
        )
        .unwrap();
        assert_eq!(either.len(), 3);
    }

    #[test]
    fn test_non_equality_is_rejected() {
        let err = join("books.author_id > authors.id", JoinType::Inner).unwrap_err();
        assert!(matches!(err, SheetqlError::JoinResolution(_)));
        let err = join("books.nope = authors.id", JoinType::Inner).unwrap_err();
        assert!(matches!(err, SheetqlError::JoinResolution(_)));
    }
}
