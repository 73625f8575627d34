//! Abstract Syntax Tree (AST) types for SELECT statements.

mod condition;
mod expression;
mod statement;

pub use condition::{CompareOp, Condition, LogicOp};
pub use expression::{is_aggregate_name, BinaryOp, Expr, FunctionCall, Literal, UnaryOp};
pub use statement::{
    JoinClause, JoinType, OrderBy, OrderDirection, SelectField, SelectStatement, SetOperation,
    SetOperator, TableSource,
};
