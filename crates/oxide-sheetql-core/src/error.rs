//! Error types for the query engine.

use crate::parser::ParseError;

/// Errors raised while parsing or executing a query.
///
/// Every variant is terminal for the current query: the engine never
/// retries and never returns partial output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SheetqlError {
    /// Unparseable clause, unbalanced expression or unresolvable
    /// `ORDER BY`/`GROUP BY` column.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Positional error produced by the expression lexer/parser.
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),

    /// Unknown table, unknown column or duplicate column name.
    #[error("schema error: {0}")]
    Schema(String),

    /// A join condition operand that cannot be attributed to any table.
    #[error("join error: {0}")]
    JoinResolution(String),

    /// Column-count mismatch between set-operation operands.
    #[error("set operation error: {0}")]
    SetOperation(String),

    /// A bind placeholder without a supplied value.
    #[error("bind error: {0}")]
    Bind(String),

    /// Malformed table settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// A broken engine invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SheetqlError {
    /// Creates a syntax error.
    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    /// Creates a schema error.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Returns true for both flavours of syntax error.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_) | Self::Parse(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SheetqlError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    #[test]
    fn test_parse_error_converts_to_syntax() {
        let err: SheetqlError = ParseError::new("dangling operator", Span::new(3, 4)).into();
        assert!(err.is_syntax());
        assert_eq!(
            err.to_string(),
            "syntax error: dangling operator at position 3..4"
        );
    }

    #[test]
    fn test_display_names_the_category() {
        let err = SheetqlError::Bind("?3".into());
        assert_eq!(err.to_string(), "bind error: ?3");
    }
}
