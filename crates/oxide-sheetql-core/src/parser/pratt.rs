//! Binding powers for scalar expression operators.

use crate::ast::{BinaryOp, CompareOp, UnaryOp};
use crate::lexer::{Keyword, TokenKind};

/// Binding power of prefix `-` and `+`.
pub const PREFIX_BINDING_POWER: u8 = 7;

/// Returns the infix binding power for an arithmetic token.
///
/// Returns `(left_bp, right_bp)` where:
/// - Higher binding power = binds tighter
/// - Left associative: left_bp < right_bp
///
/// Comparison and logical operators are not part of scalar expressions;
/// the condition parser handles them.
#[must_use]
pub const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        // Additive (string concat has same precedence as addition)
        TokenKind::Plus | TokenKind::Minus | TokenKind::Concat => Some((3, 4)),

        // Multiplicative
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((5, 6)),

        _ => None,
    }
}

/// Converts a token to a binary operator.
#[must_use]
pub const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        TokenKind::Concat => Some(BinaryOp::Concat),
        _ => None,
    }
}

/// Converts a token to a unary operator.
#[must_use]
pub const fn token_to_unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Plus => Some(UnaryOp::Plus),
        _ => None,
    }
}

/// Converts a single-token comparison operator. `NOT LIKE`, `NOT IN` and
/// `IS NOT` span two tokens and are combined by the condition parser.
#[must_use]
pub const fn token_to_compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Eq => Some(CompareOp::Eq),
        TokenKind::NotEq => Some(CompareOp::NotEq),
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::LtEq => Some(CompareOp::LtEq),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::GtEq => Some(CompareOp::GtEq),
        TokenKind::Keyword(Keyword::Like) => Some(CompareOp::Like),
        TokenKind::Keyword(Keyword::In) => Some(CompareOp::In),
        TokenKind::Keyword(Keyword::Is) => Some(CompareOp::Is),
        _ => None,
    }
}
