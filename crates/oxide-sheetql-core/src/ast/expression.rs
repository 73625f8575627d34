//! Scalar expression AST types.

use std::fmt;

use chrono::NaiveDateTime;

use super::{Condition, SelectStatement};
use crate::value::Value;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal. Integers and floats share one representation.
    Number(f64),
    /// String literal.
    String(String),
    /// Boolean literal.
    Boolean(bool),
    /// Date literal. Never produced by the parser; correlated subqueries
    /// and pivot rewrites inline date cells with it.
    Date(NaiveDateTime),
    /// NULL literal.
    Null,
}

impl Literal {
    /// Converts the literal into a cell value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(*n),
            Self::String(s) => Value::Text(s.clone()),
            Self::Boolean(b) => Value::Boolean(*b),
            Self::Date(d) => Value::Date(*d),
            Self::Null => Value::Null,
        }
    }
}

impl From<&Value> for Literal {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Boolean(b) => Self::Boolean(*b),
            Value::Number(n) => Self::Number(*n),
            Value::Date(d) => Self::Date(*d),
            Value::Text(s) => Self::String(s.clone()),
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `||`
    Concat,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Concat => "||",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Identity (+)
    Plus,
}

impl UnaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
        }
    }
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// The function name, upper-cased.
    pub name: String,
    /// The arguments.
    pub args: Vec<Expr>,
    /// Whether DISTINCT was specified.
    pub distinct: bool,
}

impl FunctionCall {
    /// Returns true if this is one of the grouping aggregates.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        is_aggregate_name(&self.name)
    }
}

/// Returns true for `SUM`, `COUNT`, `MIN`, `MAX` and `AVG`.
#[must_use]
pub fn is_aggregate_name(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "SUM" | "COUNT" | "MIN" | "MAX" | "AVG"
    )
}

/// A scalar SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal),

    /// A column reference (optionally qualified with table name or alias).
    Column {
        /// Table name or alias (optional).
        table: Option<String>,
        /// Column name.
        name: String,
    },

    /// A bind placeholder, 1-based.
    Bind(usize),

    /// A binary expression.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },

    /// A function call.
    Function(FunctionCall),

    /// Searched CASE expression. The simple form is desugared into
    /// equality conditions by the parser.
    Case {
        /// WHEN/THEN branches.
        branches: Vec<(Condition, Expr)>,
        /// ELSE result.
        else_result: Option<Box<Expr>>,
    },

    /// `IF(condition, then, otherwise)`.
    If {
        /// The tested condition.
        condition: Box<Condition>,
        /// Result when the condition holds.
        then: Box<Expr>,
        /// Result otherwise.
        otherwise: Box<Expr>,
    },

    /// A scalar or `IN` subquery.
    Subquery(Box<SelectStatement>),

    /// A parenthesized value list, right-hand side of `IN`.
    List(Vec<Expr>),

    /// Wildcard (`*` or `table.*`).
    Wildcard {
        /// Table qualifier (optional).
        table: Option<String>,
    },

    /// Parenthesized expression.
    Paren(Box<Expr>),
}

impl Expr {
    /// Creates a new column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            table: None,
            name: name.into(),
        }
    }

    /// Creates a new qualified column reference.
    #[must_use]
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Creates a numeric literal.
    #[must_use]
    pub const fn number(value: f64) -> Self {
        Self::Literal(Literal::Number(value))
    }

    /// Creates a string literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    /// Creates a NULL literal.
    #[must_use]
    pub const fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    /// Creates a function call.
    #[must_use]
    pub fn function(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Function(FunctionCall {
            name: name.into().to_ascii_uppercase(),
            args,
            distinct: false,
        })
    }

    /// Returns the aggregate call if this expression is one at top level.
    #[must_use]
    pub fn as_aggregate(&self) -> Option<&FunctionCall> {
        match self {
            Self::Function(call) if call.is_aggregate() => Some(call),
            Self::Paren(inner) => inner.as_aggregate(),
            _ => None,
        }
    }

    /// Returns true if an aggregate call appears anywhere in the expression
    /// (subqueries excluded).
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk_shallow(&mut |e| {
            if e.as_aggregate().is_some() {
                found = true;
            }
        });
        found
    }

    /// Visits this expression and every nested expression, descending into
    /// conditions and subqueries.
    pub fn walk(&self, f: &mut dyn FnMut(&Self)) {
        f(self);
        match self {
            Self::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Self::Unary { operand, .. } | Self::Paren(operand) => operand.walk(f),
            Self::Function(call) => call.args.iter().for_each(|a| a.walk(f)),
            Self::List(items) => items.iter().for_each(|a| a.walk(f)),
            Self::Case {
                branches,
                else_result,
            } => {
                for (condition, result) in branches {
                    condition.walk(f);
                    result.walk(f);
                }
                if let Some(e) = else_result {
                    e.walk(f);
                }
            }
            Self::If {
                condition,
                then,
                otherwise,
            } => {
                condition.walk(f);
                then.walk(f);
                otherwise.walk(f);
            }
            Self::Subquery(query) => query.walk(f),
            Self::Literal(_) | Self::Column { .. } | Self::Bind(_) | Self::Wildcard { .. } => {}
        }
    }

    /// Like [`Expr::walk`] but stops at subquery boundaries.
    pub fn walk_shallow(&self, f: &mut dyn FnMut(&Self)) {
        f(self);
        match self {
            Self::Binary { left, right, .. } => {
                left.walk_shallow(f);
                right.walk_shallow(f);
            }
            Self::Unary { operand, .. } | Self::Paren(operand) => operand.walk_shallow(f),
            Self::Function(call) => call.args.iter().for_each(|a| a.walk_shallow(f)),
            Self::List(items) => items.iter().for_each(|a| a.walk_shallow(f)),
            Self::Case {
                branches,
                else_result,
            } => {
                for (condition, result) in branches {
                    condition.walk_shallow(f);
                    result.walk_shallow(f);
                }
                if let Some(e) = else_result {
                    e.walk_shallow(f);
                }
            }
            Self::If {
                condition,
                then,
                otherwise,
            } => {
                condition.walk_shallow(f);
                then.walk_shallow(f);
                otherwise.walk_shallow(f);
            }
            Self::Literal(_)
            | Self::Column { .. }
            | Self::Bind(_)
            | Self::Wildcard { .. }
            | Self::Subquery(_) => {}
        }
    }
}

/// Writes an identifier, back-quoting it when it is not a plain word.
pub(crate) fn write_ident(f: &mut fmt::Formatter<'_>, ident: &str) -> fmt::Result {
    let plain = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '#')
        && !ident.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        f.write_str(ident)
    } else {
        write!(f, "`{}`", ident.replace('`', "``"))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", Value::Number(*n)),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Date(d) => write!(f, "'{}'", Value::Date(*d)),
            Self::Null => f.write_str("NULL"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Column { table, name } => {
                if let Some(table) = table {
                    write_ident(f, table)?;
                    f.write_str(".")?;
                }
                write_ident(f, name)
            }
            Self::Bind(n) => write!(f, "?{n}"),
            Self::Binary { left, op, right } => write!(f, "{left} {} {right}", op.as_str()),
            Self::Unary { op, operand } => write!(f, "{}{operand}", op.as_str()),
            Self::Function(call) => {
                write!(f, "{}(", call.name)?;
                if call.distinct {
                    f.write_str("DISTINCT ")?;
                }
                write_list(f, &call.args)?;
                f.write_str(")")
            }
            Self::Case {
                branches,
                else_result,
            } => {
                f.write_str("CASE")?;
                for (condition, result) in branches {
                    write!(f, " WHEN {condition} THEN {result}")?;
                }
                if let Some(e) = else_result {
                    write!(f, " ELSE {e}")?;
                }
                f.write_str(" END")
            }
            Self::If {
                condition,
                then,
                otherwise,
            } => write!(f, "IF({condition}, {then}, {otherwise})"),
            Self::Subquery(query) => write!(f, "({query})"),
            Self::List(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Self::Wildcard { table: Some(t) } => {
                write_ident(f, t)?;
                f.write_str(".*")
            }
            Self::Wildcard { table: None } => f.write_str("*"),
            Self::Paren(inner) => write!(f, "({inner})"),
        }
    }
}
