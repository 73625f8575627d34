//! `WHERE` and `HAVING` filtering.
//!
//! A condition tree resolves to the sorted ids of the rows it selects.
//! `AND` narrows the candidates term by term, `OR` unites the ids each term
//! selects and `NOT` keeps the candidates its operand rejects.

use std::collections::BTreeSet;

use crate::ast::{Condition, LogicOp};
use crate::error::Result;
use crate::eval::Evaluator;
use crate::fields::TableFields;
use crate::table::Table;
use crate::value::Value;

use super::QueryContext;

/// Ids of the rows of the evaluator's table that satisfy `condition`. No
/// condition selects every row.
pub(super) fn matching_rows(
    evaluator: &Evaluator<'_, '_>,
    condition: Option<&Condition>,
) -> Result<Vec<usize>> {
    let all: Vec<usize> = (0..evaluator.table().len()).collect();
    match condition {
        Some(condition) => select(evaluator, condition, all),
        None => Ok(all),
    }
}

fn select(
    evaluator: &Evaluator<'_, '_>,
    condition: &Condition,
    candidates: Vec<usize>,
) -> Result<Vec<usize>> {
    match condition {
        Condition::Logic {
            op: LogicOp::And,
            terms,
        } => {
            let mut rows = candidates;
            for term in terms {
                if rows.is_empty() {
                    break;
                }
                rows = select(evaluator, term, rows)?;
            }
            Ok(rows)
        }
        Condition::Logic {
            op: LogicOp::Or,
            terms,
        } => {
            let mut rows = BTreeSet::new();
            for term in terms {
                rows.extend(select(evaluator, term, candidates.clone())?);
            }
            Ok(rows.into_iter().collect())
        }
        Condition::Not(inner) => {
            let excluded: BTreeSet<usize> =
                select(evaluator, inner, candidates.clone())?.into_iter().collect();
            Ok(candidates
                .into_iter()
                .filter(|row| !excluded.contains(row))
                .collect())
        }
        leaf => {
            let predicate = evaluator.compile_condition(leaf)?;
            let mut rows = Vec::with_capacity(candidates.len());
            for row in candidates {
                if evaluator.test(&predicate, row)? {
                    rows.push(row);
                }
            }
            Ok(rows)
        }
    }
}

/// Filters grouped rows. The rows are exposed as a table whose columns
/// answer to every spelling of their field, so `HAVING` can name aggregates
/// and hidden columns alike.
pub(super) fn having(
    ctx: &QueryContext<'_>,
    fields: &TableFields,
    rows: Vec<Vec<Value>>,
    condition: &Condition,
) -> Result<Vec<Vec<Value>>> {
    let titles = fields.iter().map(|f| f.title.clone()).collect();
    let table = Table::with_schema("HAVING", titles, rows, fields.schema());
    let evaluator = Evaluator::new(ctx, &table);
    let keep = matching_rows(&evaluator, Some(condition))?;
    tracing::debug!(before = table.len(), after = keep.len(), "having applied");
    Ok(keep
        .into_iter()
        .map(|row| table.rows()[row].clone())
        .collect())
}
