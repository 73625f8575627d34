//! Condition trees for `WHERE`, `HAVING`, `ON`, `CASE WHEN` and `IF`.

use std::fmt;

use super::{Expr, SelectStatement};

/// Comparison operators of a condition leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
        }
    }
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    /// Returns the SQL representation of the connective.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// A boolean condition tree.
///
/// Runs of the same connective are folded into one [`Condition::Logic`]
/// node, so `a AND b AND c` has three terms.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A comparison leaf.
    Compare {
        /// Left operand.
        left: Expr,
        /// Operator.
        op: CompareOp,
        /// Right operand. A [`Expr::List`] or [`Expr::Subquery`] for `IN`.
        right: Expr,
    },
    /// `AND`/`OR` over two or more terms.
    Logic {
        /// The connective.
        op: LogicOp,
        /// The terms, in source order.
        terms: Vec<Condition>,
    },
    /// `NOT condition`.
    Not(Box<Condition>),
    /// `[NOT] EXISTS (subquery)`.
    Exists {
        /// Whether this is `NOT EXISTS`.
        negated: bool,
        /// The subquery.
        query: Box<SelectStatement>,
    },
}

impl Condition {
    /// Creates a comparison leaf.
    #[must_use]
    pub const fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Self::Compare { left, op, right }
    }

    /// Joins two conditions, folding into an existing node of the same
    /// connective.
    #[must_use]
    pub fn combine(self, op: LogicOp, other: Self) -> Self {
        match self {
            Self::Logic {
                op: existing,
                mut terms,
            } if existing == op => {
                terms.push(other);
                Self::Logic { op, terms }
            }
            first => Self::Logic {
                op,
                terms: vec![first, other],
            },
        }
    }

    /// Visits every expression in the tree, descending into subqueries.
    pub fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        match self {
            Self::Compare { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Self::Logic { terms, .. } => terms.iter().for_each(|t| t.walk(f)),
            Self::Not(inner) => inner.walk(f),
            Self::Exists { query, .. } => query.walk(f),
        }
    }

    /// Visits every expression in the tree without entering subqueries.
    pub fn walk_shallow(&self, f: &mut dyn FnMut(&Expr)) {
        match self {
            Self::Compare { left, right, .. } => {
                left.walk_shallow(f);
                right.walk_shallow(f);
            }
            Self::Logic { terms, .. } => terms.iter().for_each(|t| t.walk_shallow(f)),
            Self::Not(inner) => inner.walk_shallow(f),
            Self::Exists { .. } => {}
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { left, op, right } => write!(f, "{left} {} {right}", op.as_str()),
            Self::Logic { op, terms } => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.as_str())?;
                    }
                    match term {
                        Self::Logic { .. } => write!(f, "({term})")?,
                        _ => write!(f, "{term}")?,
                    }
                }
                Ok(())
            }
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::Exists { negated, query } => {
                if *negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "EXISTS ({query})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, n: f64) -> Condition {
        Condition::compare(Expr::column(name), CompareOp::Eq, Expr::number(n))
    }

    #[test]
    fn test_combine_folds_same_connective() {
        let cond = leaf("a", 1.0)
            .combine(LogicOp::And, leaf("b", 2.0))
            .combine(LogicOp::And, leaf("c", 3.0));
        match cond {
            Condition::Logic { op, terms } => {
                assert_eq!(op, LogicOp::And);
                assert_eq!(terms.len(), 3);
            }
            other => panic!("expected logic node, got {other:?}"),
        }
    }

    #[test]
    fn test_display_nested_logic() {
        let inner = leaf("b", 2.0).combine(LogicOp::Or, leaf("c", 3.0));
        let cond = leaf("a", 1.0).combine(LogicOp::And, inner);
        assert_eq!(cond.to_string(), "a = 1 AND (b = 2 OR c = 3)");
    }
}
