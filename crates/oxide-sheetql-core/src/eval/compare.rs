//! Comparison operators over cell values.

use regex::Regex;

use crate::ast::CompareOp;
use crate::error::{Result, SheetqlError};
use crate::value::Value;

/// Compiles a SQL `LIKE` pattern: `%` matches any run, `_` one character.
/// Matching is anchored and case-insensitive.
///
/// # Errors
///
/// Fails only if the generated expression is rejected by the regex engine.
pub fn like_regex(pattern: &str) -> Result<Regex> {
    let mut body = String::with_capacity(pattern.len() + 8);
    let mut buffer = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => body.push_str(".*"),
            '_' => body.push('.'),
            other => body.push_str(&regex::escape(other.encode_utf8(&mut buffer))),
        }
    }
    Regex::new(&format!("(?is)^{body}$"))
        .map_err(|err| SheetqlError::syntax(format!("bad LIKE pattern {pattern}: {err}")))
}

/// Applies a scalar comparison. `IN`, `NOT IN`, `LIKE` and `NOT LIKE` are
/// handled by their own helpers.
#[must_use]
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq => left.loose_eq(right),
        CompareOp::NotEq => !left.loose_eq(right),
        CompareOp::Lt => left.sql_cmp(right).is_some_and(std::cmp::Ordering::is_lt),
        CompareOp::LtEq => left.sql_cmp(right).is_some_and(std::cmp::Ordering::is_le),
        CompareOp::Gt => left.sql_cmp(right).is_some_and(std::cmp::Ordering::is_gt),
        CompareOp::GtEq => left.sql_cmp(right).is_some_and(std::cmp::Ordering::is_ge),
        CompareOp::Is if right.is_null() => left.is_null(),
        CompareOp::IsNot if right.is_null() => !left.is_null(),
        CompareOp::Is => left.loose_eq(right),
        CompareOp::IsNot => !left.loose_eq(right),
        CompareOp::In => in_list(left, std::slice::from_ref(right)),
        CompareOp::NotIn => !in_list(left, std::slice::from_ref(right)),
        CompareOp::Like => like_text(left, &right.to_string()),
        CompareOp::NotLike => !left.is_null() && !like_text(left, &right.to_string()),
    }
}

/// Returns true if `left` loosely equals any list member. Null never
/// matches.
#[must_use]
pub fn in_list(left: &Value, list: &[Value]) -> bool {
    !left.is_null() && list.iter().any(|item| left.loose_eq(item))
}

/// `LIKE` against a precompiled pattern. Null never matches.
#[must_use]
pub fn like(left: &Value, pattern: &Regex) -> bool {
    !left.is_null() && pattern.is_match(&left.to_key())
}

fn like_text(left: &Value, pattern: &str) -> bool {
    like_regex(pattern).is_ok_and(|re| like(left, &re))
}
