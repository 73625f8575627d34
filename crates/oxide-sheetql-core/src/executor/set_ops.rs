//! `UNION`, `UNION ALL`, `INTERSECT` and `EXCEPT`.
//!
//! Rows are compared by signature: the string cast of every cell joined
//! with `::`. The left operand's titles name the result.

use std::collections::HashSet;

use crate::ast::SetOperator;
use crate::error::{Result, SheetqlError};
use crate::value::Value;

use super::ResultSet;

fn signature(row: &[Value]) -> String {
    row.iter().map(Value::to_key).collect::<Vec<_>>().join("::")
}

/// Combines two operand results.
///
/// # Errors
///
/// Fails with a set-operation error when the operands have different
/// column counts.
pub(super) fn combine(left: ResultSet, operator: SetOperator, right: ResultSet) -> Result<ResultSet> {
    if left.titles.len() != right.titles.len() {
        return Err(SheetqlError::SetOperation(format!(
            "{} operands have {} and {} columns",
            operator.as_str(),
            left.titles.len(),
            right.titles.len()
        )));
    }
    let (left_rows, right_rows) = (left.len(), right.len());
    let ResultSet { titles, rows } = left;

    let rows: Vec<Vec<Value>> = match operator {
        SetOperator::UnionAll => rows.into_iter().chain(right.rows).collect(),
        SetOperator::Union => {
            let mut seen = HashSet::new();
            rows.into_iter()
                .chain(right.rows)
                .filter(|row| seen.insert(signature(row)))
                .collect()
        }
        SetOperator::Intersect => {
            let wanted: HashSet<String> = right.rows.iter().map(|r| signature(r)).collect();
            let mut seen = HashSet::new();
            rows.into_iter()
                .filter(|row| {
                    let key = signature(row);
                    wanted.contains(&key) && seen.insert(key)
                })
                .collect()
        }
        SetOperator::Except => {
            let unwanted: HashSet<String> = right.rows.iter().map(|r| signature(r)).collect();
            rows.into_iter()
                .filter(|row| !unwanted.contains(&signature(row)))
                .collect()
        }
    };
    let result = ResultSet::new(titles, rows);
    tracing::debug!(
        operator = operator.as_str(),
        left = left_rows,
        right = right_rows,
        rows = result.len(),
        "set operation applied"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(values: &[i32]) -> ResultSet {
        ResultSet::new(
            vec!["n".into()],
            values.iter().map(|&v| vec![Value::from(v)]).collect(),
        )
    }

    fn numbers(result: &ResultSet) -> Vec<Value> {
        result.column(0)
    }

    #[test]
    fn test_union_family() {
        let union = combine(result(&[1, 2, 2]), SetOperator::Union, result(&[2, 3])).unwrap();
        assert_eq!(numbers(&union), [1, 2, 3].map(Value::from));

        let all = combine(result(&[1, 2]), SetOperator::UnionAll, result(&[2, 3])).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_intersect_and_except() {
        let both = combine(result(&[1, 2, 2, 4]), SetOperator::Intersect, result(&[2, 4, 5])).unwrap();
        assert_eq!(numbers(&both), [2, 4].map(Value::from));

        let left = combine(result(&[1, 2, 3, 1]), SetOperator::Except, result(&[2])).unwrap();
        assert_eq!(numbers(&left), [1, 3, 1].map(Value::from));
    }

    #[test]
    fn test_column_count_mismatch() {
        let wide = ResultSet::new(vec!["a".into(), "b".into()], Vec::new());
        let err = combine(result(&[1]), SetOperator::Union, wide).unwrap_err();
        assert!(matches!(err, SheetqlError::SetOperation(_)));
    }
}
