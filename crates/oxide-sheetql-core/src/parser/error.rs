//! Parser error types.

use crate::lexer::{Span, Token, TokenKind};

/// A positional parse error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {}..{}", .span.start, .span.end)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// Expected tokens (if applicable).
    pub expected: Option<String>,
    /// The actual token found.
    pub found: Option<TokenKind>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
            found: None,
        }
    }

    /// Creates an "unexpected token" error, or an "unexpected end of input"
    /// error when `found` is the end of the token stream.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: &Token) -> Self {
        let expected: String = expected.into();
        let message = match &found.kind {
            TokenKind::Eof => format!("Unexpected end of input: expected {expected}"),
            TokenKind::Error(lexical) => lexical.clone(),
            other => format!("Unexpected token: expected {expected}, found {other:?}"),
        };
        Self {
            message,
            span: found.span,
            expected: Some(expected),
            found: Some(found.kind.clone()),
        }
    }
}
