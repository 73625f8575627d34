//! SQL Parser
//!
//! The statement is lexed once. A top-level scan splits it on set operators
//! and clause keywords, then each clause is analyzed by a hand-written
//! recursive descent parser with Pratt scalar expressions.

mod clauses;
mod error;
mod expression;
mod pratt;
mod splitter;

pub use error::ParseError;

use expression::ExprParser;

use crate::ast::{Condition, Expr, SelectStatement};
use crate::error::{Result, SheetqlError};
use crate::lexer::{Lexer, Token, TokenKind};

/// SQL Parser.
pub struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self { source: input }
    }

    /// Parses a SELECT statement, including set operations.
    ///
    /// # Errors
    ///
    /// Returns a syntax error if the input is not a valid statement.
    pub fn parse_statement(&self) -> Result<SelectStatement> {
        let tokens = self.tokens()?;
        let statement = clauses::parse_select(self.source, &tokens, self.source.len())?;
        tracing::debug!(statement = %statement, "parsed statement");
        Ok(statement)
    }

    /// Parses a standalone condition such as a `WHERE` body.
    ///
    /// # Errors
    ///
    /// Returns a syntax error on malformed input or trailing tokens.
    pub fn parse_condition(&self) -> Result<Condition> {
        let tokens = self.tokens()?;
        let mut parser = ExprParser::new(self.source, &tokens, self.source.len());
        let condition = parser.parse_condition()?;
        parser.expect_end()?;
        Ok(condition)
    }

    /// Parses a standalone scalar expression.
    ///
    /// # Errors
    ///
    /// Returns a syntax error on malformed input or trailing tokens.
    pub fn parse_expression(&self) -> Result<Expr> {
        let tokens = self.tokens()?;
        let mut parser = ExprParser::new(self.source, &tokens, self.source.len());
        let expr = parser.parse_expr(0)?;
        parser.expect_end()?;
        Ok(expr)
    }

    /// Lexes the input, rejecting lexical errors, dropping the end marker
    /// and trailing semicolons, and numbering bare `?` placeholders.
    fn tokens(&self) -> Result<Vec<Token>> {
        let mut tokens = Lexer::new(self.source).tokenize();
        if let Some(bad) = tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
        {
            return Err(ParseError::unexpected("token", bad).into());
        }
        while matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof | TokenKind::Semicolon)
        ) {
            tokens.pop();
        }
        number_placeholders(&mut tokens)?;
        Ok(tokens)
    }
}

/// Parses a SELECT statement.
///
/// # Errors
///
/// Returns a syntax error if the input is not a valid statement.
pub fn parse(sql: &str) -> Result<SelectStatement> {
    Parser::new(sql).parse_statement()
}

/// Numbers bare `?` placeholders left to right. Mixing `?` with `?N` in
/// one statement is rejected.
fn number_placeholders(tokens: &mut [Token]) -> Result<()> {
    let mut bare = 0usize;
    let mut numbered = false;
    for token in tokens.iter_mut() {
        match token.kind {
            TokenKind::Placeholder(None) => {
                bare += 1;
                token.kind = TokenKind::Placeholder(Some(bare));
            }
            TokenKind::Placeholder(Some(_)) => numbered = true,
            _ => {}
        }
    }
    if bare > 0 && numbered {
        return Err(SheetqlError::syntax(
            "cannot mix ? and ?N placeholders in one statement",
        ));
    }
    Ok(())
}
