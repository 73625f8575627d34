//! `PIVOT` rewriting.
//!
//! `SELECT day, SUM(qty) FROM sales GROUP BY day PIVOT customer` becomes one
//! `SUM(CASE WHEN customer = <value> THEN qty ELSE NULL END)` column per
//! distinct customer, titled `<value> SUM(qty)`.

use crate::ast::{
    CompareOp, Condition, Expr, FunctionCall, Literal, OrderBy, OrderDirection, SelectField,
    SelectStatement,
};
use crate::error::{Result, SheetqlError};

use super::QueryContext;

/// Rewrites a pivoting statement into a plain grouped one.
///
/// # Errors
///
/// Fails with a syntax error when the statement has no `GROUP BY`, and
/// propagates errors of the query collecting the pivot values.
pub(super) fn expand(ctx: &QueryContext<'_>, statement: &SelectStatement) -> Result<SelectStatement> {
    let Some(pivot) = &statement.pivot else {
        return Ok(statement.clone());
    };
    if statement.group_by.is_empty() {
        return Err(SheetqlError::syntax("PIVOT requires GROUP BY"));
    }

    let mut values_query = SelectStatement::new(
        vec![SelectField::new(pivot.clone())],
        statement.from.clone(),
    );
    values_query.distinct = true;
    values_query.joins.clone_from(&statement.joins);
    values_query.where_clause.clone_from(&statement.where_clause);
    values_query.order_by = vec![OrderBy {
        expr: pivot.clone(),
        direction: OrderDirection::Asc,
    }];
    let values = ctx.subquery(&values_query)?.column(0);

    let mut fields = Vec::with_capacity(statement.fields.len());
    for field in &statement.fields {
        let Some(call) = field.expr.as_aggregate() else {
            fields.push(field.clone());
            continue;
        };
        for value in &values {
            let expr = pivot_call(call, pivot, Literal::from(value));
            fields.push(SelectField::with_alias(
                expr,
                format!("{value} {}", field.title()),
            ));
        }
    }
    tracing::debug!(pivot = %pivot, values = values.len(), "pivot expanded");

    let mut expanded = statement.clone();
    expanded.fields = fields;
    expanded.pivot = None;
    Ok(expanded)
}

/// `AGG(CASE WHEN pivot = value THEN arg ELSE NULL END)`, with `COUNT(*)`
/// counting a constant.
fn pivot_call(call: &FunctionCall, pivot: &Expr, value: Literal) -> Expr {
    let then = match call.args.first() {
        Some(Expr::Wildcard { .. }) | None => Expr::number(1.0),
        Some(arg) => arg.clone(),
    };
    let case = Expr::Case {
        branches: vec![(
            Condition::compare(pivot.clone(), CompareOp::Eq, Expr::Literal(value)),
            then,
        )],
        else_result: Some(Box::new(Expr::null())),
    };
    Expr::Function(FunctionCall {
        name: call.name.clone(),
        args: vec![case],
        distinct: call.distinct,
    })
}
