//! Recursive-descent condition parser with Pratt scalar expressions.
//!
//! Operates on a slice of already-lexed tokens, so clause segments and
//! parenthesized subqueries can be parsed without re-lexing.

use super::clauses;
use super::error::ParseError;
use super::pratt::{
    infix_binding_power, token_to_binary_op, token_to_compare_op, token_to_unary_op,
    PREFIX_BINDING_POWER,
};
use crate::ast::{
    CompareOp, Condition, Expr, FunctionCall, Literal, LogicOp, SelectStatement, UnaryOp,
};
use crate::error::Result;
use crate::lexer::{Keyword, Span, Token, TokenKind};

/// Parser over one token slice.
pub(crate) struct ExprParser<'s, 't> {
    source: &'s str,
    tokens: &'t [Token],
    pos: usize,
    eof: Token,
}

impl<'s, 't> ExprParser<'s, 't> {
    /// Creates a parser over `tokens`. `end` is the byte offset reported
    /// for errors at the end of the slice.
    pub(crate) fn new(source: &'s str, tokens: &'t [Token], end: usize) -> Self {
        let end = tokens.last().map_or(end, |t| t.span.end);
        Self {
            source,
            tokens,
            pos: 0,
            eof: Token::new(TokenKind::Eof, Span::new(end, end)),
        }
    }

    pub(crate) fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    pub(crate) const fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    pub(crate) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected(what, self.current()).into())
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected(keyword.as_str(), self.current()).into())
        }
    }

    /// Fails unless every token of the slice was consumed.
    pub(crate) fn expect_end(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(ParseError::unexpected("end of clause", self.current()).into())
        }
    }

    /// Source text covered by tokens `from..pos`.
    pub(crate) fn source_text(&self, from: usize) -> String {
        match (self.tokens.get(from), self.pos.checked_sub(1)) {
            (Some(first), Some(last)) if last >= from => {
                let end = self.tokens[last].span.end;
                self.source
                    .get(first.span.start..end)
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            }
            _ => String::new(),
        }
    }

    /// Expects an identifier (or a quoted name) and returns its text.
    pub(crate) fn expect_name(&mut self, what: &str) -> Result<String> {
        match &self.current().kind {
            TokenKind::Identifier(name) | TokenKind::String(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::unexpected(what, self.current()).into()),
        }
    }

    /// Index of the `)` matching the `(` at `open`.
    fn matching_paren(&self, open: usize) -> Result<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(ParseError::new("Unbalanced parenthesis", self.tokens[open].span).into())
    }

    /// Parses `( SELECT ... )` into a statement.
    pub(crate) fn parse_parenthesized_select(&mut self) -> Result<SelectStatement> {
        if !self.check(&TokenKind::LeftParen) {
            return Err(ParseError::unexpected("(", self.current()).into());
        }
        let open = self.pos;
        let close = self.matching_paren(open)?;
        let inner = &self.tokens[open + 1..close];
        let statement = clauses::parse_select(self.source, inner, self.tokens[close].span.start)?;
        self.pos = close + 1;
        Ok(statement)
    }

    fn at_subquery(&self) -> bool {
        self.check(&TokenKind::LeftParen)
            && matches!(self.peek_kind(1), TokenKind::Keyword(Keyword::Select))
    }

    // ==================== Conditions ====================

    /// Parses `term (OR term)*`. AND binds tighter than OR.
    pub(crate) fn parse_condition(&mut self) -> Result<Condition> {
        let mut condition = self.parse_and()?;
        while self.check_keyword(Keyword::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            condition = condition.combine(LogicOp::Or, rhs);
        }
        Ok(condition)
    }

    fn parse_and(&mut self) -> Result<Condition> {
        let mut condition = self.parse_not()?;
        while self.check_keyword(Keyword::And) {
            self.advance();
            let rhs = self.parse_not()?;
            condition = condition.combine(LogicOp::And, rhs);
        }
        Ok(condition)
    }

    fn parse_not(&mut self) -> Result<Condition> {
        if self.check_keyword(Keyword::Not) {
            self.advance();
            if self.check_keyword(Keyword::Exists) {
                self.advance();
                let query = self.parse_parenthesized_select()?;
                return Ok(Condition::Exists {
                    negated: true,
                    query: Box::new(query),
                });
            }
            let inner = self.parse_not()?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_predicate()
    }

    /// True when the current token may follow a complete condition.
    fn at_condition_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Eof
                | TokenKind::RightParen
                | TokenKind::Comma
                | TokenKind::Keyword(
                    Keyword::And | Keyword::Or | Keyword::Then | Keyword::Else | Keyword::End
                )
        ) || self.is_at_end()
    }

    fn parse_predicate(&mut self) -> Result<Condition> {
        if self.check_keyword(Keyword::Exists) {
            self.advance();
            let query = self.parse_parenthesized_select()?;
            return Ok(Condition::Exists {
                negated: false,
                query: Box::new(query),
            });
        }

        // A parenthesized group is either a nested condition or the start
        // of an arithmetic operand; try the condition first.
        if self.check(&TokenKind::LeftParen) && !self.at_subquery() {
            let saved = self.pos;
            self.advance();
            if let Ok(condition) = self.parse_condition() {
                if self.check(&TokenKind::RightParen) {
                    self.advance();
                    if self.at_condition_end() {
                        return Ok(condition);
                    }
                }
            }
            self.pos = saved;
        }

        let left = self.parse_expr(0)?;

        let negated = if self.check_keyword(Keyword::Not) {
            self.advance();
            true
        } else {
            false
        };

        if self.check_keyword(Keyword::Between) {
            self.advance();
            let low = self.parse_expr(0)?;
            self.expect_keyword(Keyword::And)?;
            let high = self.parse_expr(0)?;
            let range = Condition::compare(left.clone(), CompareOp::GtEq, low)
                .combine(LogicOp::And, Condition::compare(left, CompareOp::LtEq, high));
            return Ok(if negated {
                Condition::Not(Box::new(range))
            } else {
                range
            });
        }

        let op_token = self.current().clone();
        let Some(op) = token_to_compare_op(&op_token.kind) else {
            return Err(ParseError::unexpected("comparison operator", &op_token).into());
        };
        self.advance();

        let op = match (op, negated) {
            (CompareOp::Like, true) => CompareOp::NotLike,
            (CompareOp::In, true) => CompareOp::NotIn,
            (_, true) => {
                return Err(ParseError::new(
                    "NOT must be followed by LIKE, IN or BETWEEN",
                    op_token.span,
                )
                .into());
            }
            (CompareOp::Is, false) if self.check_keyword(Keyword::Not) => {
                self.advance();
                CompareOp::IsNot
            }
            (op, false) => op,
        };

        let right = if matches!(op, CompareOp::In | CompareOp::NotIn) {
            self.parse_in_list()?
        } else {
            self.parse_expr(0)?
        };

        Ok(Condition::compare(left, op, right))
    }

    /// Parses the right-hand side of `IN`: a value list or a subquery.
    fn parse_in_list(&mut self) -> Result<Expr> {
        if self.at_subquery() {
            return Ok(Expr::Subquery(Box::new(self.parse_parenthesized_select()?)));
        }
        self.expect(&TokenKind::LeftParen, "(")?;
        let mut items = vec![];
        if !self.check(&TokenKind::RightParen) {
            loop {
                items.push(self.parse_expr(0)?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen, ")")?;
        Ok(Expr::List(items))
    }

    // ==================== Scalar expressions ====================

    /// Parses a scalar expression using Pratt parsing.
    pub(crate) fn parse_expr(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((l_bp, r_bp)) = infix_binding_power(&self.current().kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            let Some(op) = token_to_binary_op(&self.current().kind) else {
                break;
            };
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = Expr::Binary {
                left: Box::new(lhs),
                op,
                right: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        if let Some(op) = token_to_unary_op(&token.kind) {
            self.advance();
            let operand = self.parse_expr(PREFIX_BINDING_POWER)?;
            return Ok(match (op, operand) {
                (UnaryOp::Neg, Expr::Literal(Literal::Number(n))) => Expr::number(-n),
                (op, operand) => Expr::Unary {
                    op,
                    operand: Box::new(operand),
                },
            });
        }

        match token.kind {
            #[allow(clippy::cast_precision_loss)]
            TokenKind::Integer(i) => {
                self.advance();
                Ok(Expr::number(i as f64))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::number(f))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::string(s))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::null())
            }
            TokenKind::Placeholder(Some(n)) => {
                self.advance();
                Ok(Expr::Bind(n))
            }
            TokenKind::Star => {
                self.advance();
                Ok(Expr::Wildcard { table: None })
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::Keyword(kw @ (Keyword::Left | Keyword::Right))
                if matches!(self.peek_kind(1), TokenKind::LeftParen) =>
            {
                self.advance();
                self.parse_function(kw.as_str().to_string())
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    return self.parse_function(name);
                }
                if !self.check(&TokenKind::Dot) {
                    return Ok(Expr::column(name));
                }
                self.advance();
                let next = self.advance();
                match next.kind {
                    TokenKind::Star => Ok(Expr::Wildcard { table: Some(name) }),
                    TokenKind::Identifier(column) => Ok(Expr::qualified_column(name, column)),
                    TokenKind::Keyword(kw) => Ok(Expr::qualified_column(name, kw.as_str())),
                    _ => Err(ParseError::unexpected("column name", &next).into()),
                }
            }
            TokenKind::LeftParen => {
                if self.at_subquery() {
                    let query = self.parse_parenthesized_select()?;
                    return Ok(Expr::Subquery(Box::new(query)));
                }
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(&TokenKind::RightParen, ")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            _ => Err(ParseError::unexpected("expression", &token).into()),
        }
    }

    fn parse_function(&mut self, name: String) -> Result<Expr> {
        let name = name.to_ascii_uppercase();
        self.expect(&TokenKind::LeftParen, "(")?;

        if name == "IF" {
            let condition = self.parse_condition()?;
            self.expect(&TokenKind::Comma, ",")?;
            let then = self.parse_expr(0)?;
            self.expect(&TokenKind::Comma, ",")?;
            let otherwise = self.parse_expr(0)?;
            self.expect(&TokenKind::RightParen, ")")?;
            return Ok(Expr::If {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }

        let distinct = if self.check_keyword(Keyword::Distinct) {
            self.advance();
            true
        } else {
            if self.check_keyword(Keyword::All) {
                self.advance();
            }
            false
        };

        let mut args = vec![];
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr(0)?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen, ")")?;

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            distinct,
        }))
    }

    fn parse_case(&mut self) -> Result<Expr> {
        self.expect_keyword(Keyword::Case)?;

        // Simple CASE: CASE operand WHEN value THEN ...
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };

        let mut branches = vec![];
        while self.check_keyword(Keyword::When) {
            self.advance();
            let condition = match &operand {
                Some(operand) => {
                    Condition::compare(operand.clone(), CompareOp::Eq, self.parse_expr(0)?)
                }
                None => self.parse_condition()?,
            };
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expr(0)?;
            branches.push((condition, result));
        }
        if branches.is_empty() {
            return Err(ParseError::unexpected("WHEN", self.current()).into());
        }

        let else_result = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.parse_expr(0)?))
        } else {
            None
        };
        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            branches,
            else_result,
        })
    }
}
