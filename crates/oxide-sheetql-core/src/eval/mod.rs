//! Calculated-field evaluation.
//!
//! Expressions are compiled once into a [`Node`] tree with every column
//! reference resolved to a slot of the table being evaluated, then walked
//! per row. Compiled trees are memoized by their canonical rendering, so a
//! formula repeated across fields or clauses compiles once per table.

mod compare;
mod functions;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use regex::Regex;

pub use compare::{compare, in_list, like, like_regex};
pub use functions::Function;

use crate::ast::{BinaryOp, CompareOp, Condition, Expr, FunctionCall, LogicOp, SelectStatement, UnaryOp};
use crate::error::{Result, SheetqlError};
use crate::executor::{correlate, QueryContext, ResultSet};
use crate::fields::{column_spelling, FieldKind, TableField};
use crate::table::Table;
use crate::value::Value;

/// A compiled scalar expression.
#[derive(Debug)]
pub(crate) enum Node {
    Const(Value),
    Slot(usize),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Neg(Box<Node>),
    Call {
        function: Function,
        args: Vec<Node>,
    },
    Case {
        branches: Vec<(Predicate, Node)>,
        otherwise: Option<Box<Node>>,
    },
    Subquery {
        query: Box<SelectStatement>,
        correlated: bool,
    },
    List(Vec<Node>),
}

/// A compiled condition.
#[derive(Debug)]
pub(crate) enum Predicate {
    Compare {
        left: Node,
        op: CompareOp,
        right: Node,
        /// Prebuilt pattern for `LIKE` against a constant.
        pattern: Option<Regex>,
    },
    Logic {
        op: LogicOp,
        terms: Vec<Predicate>,
    },
    Not(Box<Predicate>),
    Exists {
        negated: bool,
        query: Box<SelectStatement>,
        correlated: bool,
    },
}

/// Evaluates expressions against the rows of one table.
pub struct Evaluator<'q, 'a> {
    ctx: &'q QueryContext<'a>,
    table: &'q Table,
    cache: RefCell<HashMap<String, Rc<Node>>>,
}

impl<'q, 'a> Evaluator<'q, 'a> {
    /// Creates an evaluator over `table`.
    #[must_use]
    pub fn new(ctx: &'q QueryContext<'a>, table: &'q Table) -> Self {
        Self {
            ctx,
            table,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The table rows are read from.
    #[must_use]
    pub const fn table(&self) -> &'q Table {
        self.table
    }

    /// Evaluates a scalar expression for one row.
    ///
    /// # Errors
    ///
    /// Fails for unknown columns or functions, missing binds and failing
    /// subqueries.
    pub fn evaluate(&self, expr: &Expr, row: usize) -> Result<Value> {
        let node = self.compile(expr)?;
        self.eval(&node, row)
    }

    /// Tests a condition for one row.
    ///
    /// # Errors
    ///
    /// Same as [`Evaluator::evaluate`].
    pub fn matches(&self, condition: &Condition, row: usize) -> Result<bool> {
        let predicate = self.compile_condition(condition)?;
        self.test(&predicate, row)
    }

    pub(crate) fn compile(&self, expr: &Expr) -> Result<Rc<Node>> {
        let key = expr.to_string();
        if let Some(node) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(node));
        }
        let node = Rc::new(self.build(expr)?);
        self.cache.borrow_mut().insert(key, Rc::clone(&node));
        Ok(node)
    }

    pub(crate) fn compile_field(&self, field: &TableField) -> Result<Rc<Node>> {
        match &field.kind {
            FieldKind::Column { .. } => field
                .physical()
                .map(|slot| Rc::new(Node::Slot(slot)))
                .ok_or_else(|| SheetqlError::Internal(format!("field {} has no column", field.title))),
            FieldKind::Calculated(expr) => self.compile(expr),
            FieldKind::Subquery(query) => Ok(Rc::new(self.subquery_node(query))),
            FieldKind::Star => Ok(Rc::new(Node::Const(Value::text("*")))),
        }
    }

    fn subquery_node(&self, query: &SelectStatement) -> Node {
        Node::Subquery {
            correlated: correlate::is_correlated(self.ctx.tables(), query, self.table),
            query: Box::new(query.clone()),
        }
    }

    fn build(&self, expr: &Expr) -> Result<Node> {
        if !matches!(expr, Expr::Literal(_) | Expr::Bind(_) | Expr::Column { .. }) {
            // Grouped rows expose computed fields under their rendering.
            if let Some(slot) = self.table.column(&expr.to_string()) {
                return Ok(Node::Slot(slot));
            }
        }
        let node = match expr {
            Expr::Literal(literal) => Node::Const(literal.to_value()),
            Expr::Column { table, name } => {
                let spelling = column_spelling(table.as_deref(), name);
                let slot = self
                    .table
                    .column(&spelling)
                    .or_else(|| self.table.column(&expr.to_string()))
                    .ok_or_else(|| SheetqlError::schema(format!("unknown column {expr}")))?;
                Node::Slot(slot)
            }
            Expr::Bind(n) => Node::Const(self.ctx.binds().get(*n)?.clone()),
            Expr::Binary { left, op, right } => Node::Binary {
                op: *op,
                left: Box::new(self.build(left)?),
                right: Box::new(self.build(right)?),
            },
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Node::Neg(Box::new(self.build(operand)?)),
            Expr::Unary {
                op: UnaryOp::Plus,
                operand,
            }
            | Expr::Paren(operand) => self.build(operand)?,
            Expr::Function(call) => self.build_call(expr, call)?,
            Expr::Case {
                branches,
                else_result,
            } => Node::Case {
                branches: branches
                    .iter()
                    .map(|(condition, result)| {
                        Ok((self.compile_condition(condition)?, self.build(result)?))
                    })
                    .collect::<Result<_>>()?,
                otherwise: else_result
                    .as_ref()
                    .map(|e| self.build(e).map(Box::new))
                    .transpose()?,
            },
            Expr::If {
                condition,
                then,
                otherwise,
            } => Node::Case {
                branches: vec![(self.compile_condition(condition)?, self.build(then)?)],
                otherwise: Some(Box::new(self.build(otherwise)?)),
            },
            Expr::Subquery(query) => self.subquery_node(query),
            Expr::List(items) => Node::List(
                items
                    .iter()
                    .map(|item| self.build(item))
                    .collect::<Result<_>>()?,
            ),
            Expr::Wildcard { .. } => Node::Const(Value::text("*")),
        };
        Ok(node)
    }

    fn build_call(&self, expr: &Expr, call: &FunctionCall) -> Result<Node> {
        if call.is_aggregate() {
            return Err(SheetqlError::syntax(format!(
                "aggregate {expr} is not allowed here"
            )));
        }
        let function = Function::from_name(&call.name)
            .ok_or_else(|| SheetqlError::syntax(format!("unknown function {}", call.name)))?;
        function.check_arity(&call.name, call.args.len())?;
        let args = call
            .args
            .iter()
            .enumerate()
            .map(|(i, arg)| match (function, i, arg) {
                // CONVERT(value, SIGNED): the target type is a bare word.
                (Function::Convert, 1, Expr::Column { table: None, name }) => {
                    Ok(Node::Const(Value::text(name.clone())))
                }
                _ => self.build(arg),
            })
            .collect::<Result<_>>()?;
        Ok(Node::Call { function, args })
    }

    pub(crate) fn compile_condition(&self, condition: &Condition) -> Result<Predicate> {
        let predicate = match condition {
            Condition::Compare { left, op, right } => {
                let left = self.build(left)?;
                let right = self.build(right)?;
                let pattern = match (op, &right) {
                    (CompareOp::Like | CompareOp::NotLike, Node::Const(value)) => {
                        Some(like_regex(&value.to_string())?)
                    }
                    _ => None,
                };
                Predicate::Compare {
                    left,
                    op: *op,
                    right,
                    pattern,
                }
            }
            Condition::Logic { op, terms } => Predicate::Logic {
                op: *op,
                terms: terms
                    .iter()
                    .map(|t| self.compile_condition(t))
                    .collect::<Result<_>>()?,
            },
            Condition::Not(inner) => Predicate::Not(Box::new(self.compile_condition(inner)?)),
            Condition::Exists { negated, query } => Predicate::Exists {
                negated: *negated,
                correlated: correlate::is_correlated(self.ctx.tables(), query, self.table),
                query: query.clone(),
            },
        };
        Ok(predicate)
    }

    pub(crate) fn eval(&self, node: &Node, row: usize) -> Result<Value> {
        match node {
            Node::Const(value) => Ok(value.clone()),
            Node::Slot(column) => Ok(self.table.value(row, *column).clone()),
            Node::Binary { op, left, right } => Ok(arithmetic(
                *op,
                &self.eval(left, row)?,
                &self.eval(right, row)?,
            )),
            Node::Neg(inner) => {
                let value = self.eval(inner, row)?;
                Ok(match value.as_number() {
                    Some(n) => Value::Number(-n),
                    None if value.is_null() => Value::Null,
                    None => Value::Number(f64::NAN),
                })
            }
            Node::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, row))
                    .collect::<Result<Vec<_>>>()?;
                Ok(function.call(&values))
            }
            Node::Case {
                branches,
                otherwise,
            } => {
                for (predicate, result) in branches {
                    if self.test(predicate, row)? {
                        return self.eval(result, row);
                    }
                }
                otherwise
                    .as_ref()
                    .map_or(Ok(Value::Null), |node| self.eval(node, row))
            }
            Node::Subquery { query, correlated } => {
                Ok(self.subquery(query, *correlated, row)?.scalar())
            }
            Node::List(_) => Err(SheetqlError::syntax(
                "a value list is only allowed after IN",
            )),
        }
    }

    fn eval_list(&self, node: &Node, row: usize) -> Result<Vec<Value>> {
        match node {
            Node::List(items) => items.iter().map(|item| self.eval(item, row)).collect(),
            Node::Subquery { query, correlated } => {
                Ok(self.subquery(query, *correlated, row)?.column(0))
            }
            other => Ok(vec![self.eval(other, row)?]),
        }
    }

    pub(crate) fn test(&self, predicate: &Predicate, row: usize) -> Result<bool> {
        match predicate {
            Predicate::Compare {
                left,
                op,
                right,
                pattern,
            } => {
                let value = self.eval(left, row)?;
                match (op, pattern) {
                    (CompareOp::In | CompareOp::NotIn, _) => {
                        let items = self.eval_list(right, row)?;
                        let hit = in_list(&value, &items);
                        Ok(if *op == CompareOp::In {
                            hit
                        } else {
                            !value.is_null() && !hit
                        })
                    }
                    (CompareOp::Like, Some(re)) => Ok(like(&value, re)),
                    (CompareOp::NotLike, Some(re)) => Ok(!value.is_null() && !like(&value, re)),
                    _ => Ok(compare(*op, &value, &self.eval(right, row)?)),
                }
            }
            Predicate::Logic {
                op: LogicOp::And,
                terms,
            } => {
                for term in terms {
                    if !self.test(term, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Logic {
                op: LogicOp::Or,
                terms,
            } => {
                for term in terms {
                    if self.test(term, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!self.test(inner, row)?),
            Predicate::Exists {
                negated,
                query,
                correlated,
            } => {
                // Existence is judged on the concatenated cell text, so a
                // result made only of empty cells does not exist.
                let result = self.subquery(query, *correlated, row)?;
                let found = result
                    .rows
                    .iter()
                    .flatten()
                    .any(|cell| !cell.to_string().is_empty());
                Ok(found != *negated)
            }
        }
    }

    fn subquery(
        &self,
        query: &SelectStatement,
        correlated: bool,
        row: usize,
    ) -> Result<Rc<ResultSet>> {
        if correlated {
            // Bound copies differ per outer row, so they bypass the memo.
            let bound = correlate::bind_outer(self.ctx.tables(), query, self.table, row);
            Ok(Rc::new(self.ctx.run(&bound)?))
        } else {
            self.ctx.subquery(query)
        }
    }
}

/// Applies an arithmetic operator. `+` adds numbers and concatenates
/// anything else; `||` always concatenates.
fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Value {
    if op == BinaryOp::Concat {
        return Value::Text(format!("{left}{right}"));
    }
    let Some((a, b)) = left.as_number().zip(right.as_number()) else {
        if left.is_null() || right.is_null() {
            return Value::Null;
        }
        if op == BinaryOp::Add {
            return Value::Text(format!("{left}{right}"));
        }
        return Value::Number(f64::NAN);
    };
    Value::Number(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod | BinaryOp::Concat => a % b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BindData;
    use crate::parser::Parser;
    use crate::table::TableMap;

    fn table() -> Table {
        Table::new(
            "sales",
            vec![
                vec!["item".into(), "price".into(), "qty".into(), "sold".into()],
                vec!["Pen".into(), 2.5.into(), 4.into(), Value::date(2022, 6, 1)],
                vec!["Ink".into(), "10".into(), Value::Null, "2021-12-31".into()],
            ],
        )
        .unwrap()
    }

    fn eval(sql: &str, row: usize) -> Result<Value> {
        let tables = TableMap::new();
        let binds: BindData = ["bound"].into_iter().collect();
        let ctx = QueryContext::new(&tables, &binds);
        let table = table();
        let evaluator = Evaluator::new(&ctx, &table);
        let expr = Parser::new(sql).parse_expression()?;
        evaluator.evaluate(&expr, row)
    }

    fn test(sql: &str, row: usize) -> bool {
        let tables = TableMap::new();
        let binds = BindData::new();
        let ctx = QueryContext::new(&tables, &binds);
        let table = table();
        let evaluator = Evaluator::new(&ctx, &table);
        let condition = Parser::new(sql).parse_condition().unwrap();
        evaluator.matches(&condition, row).unwrap()
    }

    #[test]
    fn test_arithmetic_coerces_numeric_text() {
        assert_eq!(eval("price * 2", 1).unwrap(), Value::from(20));
        assert_eq!(eval("price * qty", 0).unwrap(), Value::from(10));
        assert_eq!(eval("-price", 0).unwrap(), Value::from(-2.5));
    }

    #[test]
    fn test_plus_concatenates_text() {
        assert_eq!(eval("item + '!'", 0).unwrap(), Value::from("Pen!"));
        assert_eq!(eval("item || qty", 0).unwrap(), Value::from("Pen4"));
        assert_eq!(eval("price + qty", 1).unwrap(), Value::Null);
    }

    #[test]
    fn test_functions_and_case() {
        assert_eq!(eval("UPPER(LEFT(item, 2))", 0).unwrap(), Value::from("PE"));
        assert_eq!(eval("YEAR(sold)", 1).unwrap(), Value::from(2021));
        assert_eq!(
            eval("CASE WHEN qty > 1 THEN 'many' ELSE 'few' END", 0).unwrap(),
            Value::from("many")
        );
        assert_eq!(eval("CASE WHEN qty > 1 THEN 'many' END", 1).unwrap(), Value::Null);
        assert_eq!(eval("IF(item = 'Ink', 1, 0)", 1).unwrap(), Value::from(1));
        assert_eq!(eval("CONVERT(price, SIGNED)", 0).unwrap(), Value::from(2));
    }

    #[test]
    fn test_bind_value() {
        assert_eq!(eval("?1", 0).unwrap(), Value::from("bound"));
        assert!(matches!(eval("?2", 0), Err(SheetqlError::Bind(_))));
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(eval("nope + 1", 0), Err(SheetqlError::Schema(_))));
        assert!(eval("NOPE(item)", 0).unwrap_err().is_syntax());
        assert!(eval("SUM(price)", 0).unwrap_err().is_syntax());
    }

    #[test]
    fn test_correlated_subqueries_skip_the_memo() {
        let tables: TableMap = [Table::new(
            "rates",
            vec![
                vec!["item".into(), "rate".into()],
                vec!["Pen".into(), 3.into()],
                vec!["Ink".into(), 7.into()],
            ],
        )
        .unwrap()]
        .into_iter()
        .collect();
        let binds = BindData::new();
        let ctx = QueryContext::new(&tables, &binds);
        let table = table();
        let evaluator = Evaluator::new(&ctx, &table);

        let correlated = Parser::new("(SELECT rate FROM rates WHERE rates.item = sales.item)")
            .parse_expression()
            .unwrap();
        assert_eq!(evaluator.evaluate(&correlated, 0).unwrap(), Value::from(3));
        assert_eq!(evaluator.evaluate(&correlated, 1).unwrap(), Value::from(7));
        assert_eq!(ctx.memoized_subqueries(), 0);

        let plain = Parser::new("(SELECT MAX(rate) FROM rates)").parse_expression().unwrap();
        assert_eq!(evaluator.evaluate(&plain, 0).unwrap(), Value::from(7));
        assert_eq!(evaluator.evaluate(&plain, 1).unwrap(), Value::from(7));
        assert_eq!(ctx.memoized_subqueries(), 1);
    }

    #[test]
    fn test_conditions() {
        assert!(test("item LIKE 'p%'", 0));
        assert!(test("item NOT LIKE 'p%'", 1));
        assert!(test("qty IS NULL", 1));
        assert!(test("price IN (1, 10)", 1));
        assert!(!test("qty NOT IN (1, 2)", 1));
        assert!(test("sold > '2022-01-01' AND NOT (item = 'Ink')", 0));
        assert!(test("(qty > 10 OR price BETWEEN 9 AND 11)", 1));
    }
}
