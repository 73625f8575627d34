//! Top-level statement splitting.
//!
//! Both passes only look at tokens outside parentheses, so keywords of
//! nested subqueries and function calls never split the outer statement.

use super::error::ParseError;
use crate::ast::{JoinType, SetOperator};
use crate::error::{Result, SheetqlError};
use crate::lexer::{Keyword, Span, Token, TokenKind};

/// A clause keyword recognized at the top level of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClauseKind {
    Select,
    From,
    Join(JoinType),
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Pivot,
}

impl ClauseKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Join(join_type) => join_type.as_str(),
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::Limit => "LIMIT",
            Self::Pivot => "PIVOT",
        }
    }
}

/// One clause: its keyword and the tokens up to the next clause.
#[derive(Debug)]
pub(crate) struct Segment<'t> {
    pub(crate) kind: ClauseKind,
    pub(crate) keyword_span: Span,
    pub(crate) tokens: &'t [Token],
}

/// Computes the parenthesis depth before each token.
fn depths(tokens: &[Token]) -> Result<Vec<usize>> {
    let mut depth = 0usize;
    let mut result = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.kind {
            TokenKind::LeftParen => {
                result.push(depth);
                depth += 1;
            }
            TokenKind::RightParen => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    SheetqlError::from(ParseError::new("Unbalanced parenthesis", token.span))
                })?;
                result.push(depth);
            }
            _ => result.push(depth),
        }
    }
    if depth != 0 {
        let span = tokens.last().map_or_else(Span::default, |t| t.span);
        return Err(ParseError::new("Unbalanced parenthesis", span).into());
    }
    Ok(result)
}

/// Removes one pair of parentheses wrapping the whole slice.
fn strip_wrapping_parens(tokens: &[Token]) -> &[Token] {
    let wrapped = tokens.len() >= 2
        && tokens[0].kind == TokenKind::LeftParen
        && tokens[tokens.len() - 1].kind == TokenKind::RightParen;
    if !wrapped {
        return tokens;
    }
    // The opening paren must close at the very end.
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return if i == tokens.len() - 1 {
                        strip_wrapping_parens(&tokens[1..i])
                    } else {
                        tokens
                    };
                }
            }
            _ => {}
        }
    }
    tokens
}

/// An operand of a set operation chain.
pub(crate) type SetOperand<'t> = (Option<SetOperator>, &'t [Token]);

/// Splits on top-level `UNION [ALL]`, `INTERSECT` and `EXCEPT`.
///
/// The first operand carries `None`; every following operand carries the
/// operator that precedes it.
pub(crate) fn split_set_operations(tokens: &[Token]) -> Result<Vec<SetOperand<'_>>> {
    let depths = depths(tokens)?;
    let mut operands = vec![];
    let mut pending: Option<SetOperator> = None;
    let mut start = 0;
    let mut i = 0;

    while i < tokens.len() {
        let operator = if depths[i] == 0 {
            match tokens[i].as_keyword() {
                Some(Keyword::Union) => {
                    if tokens.get(i + 1).is_some_and(|t| t.is_keyword(Keyword::All)) {
                        Some((SetOperator::UnionAll, 2))
                    } else {
                        Some((SetOperator::Union, 1))
                    }
                }
                Some(Keyword::Intersect) => Some((SetOperator::Intersect, 1)),
                Some(Keyword::Except) => Some((SetOperator::Except, 1)),
                _ => None,
            }
        } else {
            None
        };

        if let Some((operator, width)) = operator {
            push_operand(&mut operands, pending, &tokens[start..i], tokens[i].span)?;
            pending = Some(operator);
            i += width;
            start = i;
        } else {
            i += 1;
        }
    }

    let end_span = tokens.last().map_or_else(Span::default, |t| t.span);
    push_operand(&mut operands, pending, &tokens[start..], end_span)?;
    Ok(operands)
}

fn push_operand<'t>(
    operands: &mut Vec<SetOperand<'t>>,
    operator: Option<SetOperator>,
    tokens: &'t [Token],
    span: Span,
) -> Result<()> {
    let tokens = strip_wrapping_parens(tokens);
    if tokens.is_empty() {
        return Err(ParseError::new("Missing SELECT statement", span).into());
    }
    operands.push((operator, tokens));
    Ok(())
}

/// Recognizes a clause keyword starting at `i`, returning its kind and
/// how many tokens the keyword spans.
fn clause_at(tokens: &[Token], i: usize) -> Option<(ClauseKind, usize)> {
    let keyword_at = |offset: usize| tokens.get(i + offset).and_then(Token::as_keyword);
    let join_after = |offset: usize| -> Option<usize> {
        match keyword_at(offset) {
            Some(Keyword::Join) => Some(offset + 1),
            Some(Keyword::Outer) if keyword_at(offset + 1) == Some(Keyword::Join) => {
                Some(offset + 2)
            }
            _ => None,
        }
    };

    match keyword_at(0)? {
        Keyword::Select => Some((ClauseKind::Select, 1)),
        Keyword::From => Some((ClauseKind::From, 1)),
        Keyword::Where => Some((ClauseKind::Where, 1)),
        Keyword::Having => Some((ClauseKind::Having, 1)),
        Keyword::Limit => Some((ClauseKind::Limit, 1)),
        Keyword::Pivot => Some((ClauseKind::Pivot, 1)),
        Keyword::Group if keyword_at(1) == Some(Keyword::By) => Some((ClauseKind::GroupBy, 2)),
        Keyword::Order if keyword_at(1) == Some(Keyword::By) => Some((ClauseKind::OrderBy, 2)),
        Keyword::Join => Some((ClauseKind::Join(JoinType::Inner), 1)),
        Keyword::Inner if keyword_at(1) == Some(Keyword::Join) => {
            Some((ClauseKind::Join(JoinType::Inner), 2))
        }
        Keyword::Left => join_after(1).map(|n| (ClauseKind::Join(JoinType::Left), n)),
        Keyword::Right => join_after(1).map(|n| (ClauseKind::Join(JoinType::Right), n)),
        Keyword::Full => join_after(1).map(|n| (ClauseKind::Join(JoinType::Full), n)),
        _ => None,
    }
}

/// Splits one SELECT statement into clause segments, in source order.
///
/// Fails when the statement does not start with `SELECT`, when a
/// non-`JOIN` clause repeats, or when `SELECT`/`FROM` is missing.
pub(crate) fn split_clauses(tokens: &[Token]) -> Result<Vec<Segment<'_>>> {
    let depths = depths(tokens)?;
    let mut starts: Vec<(usize, ClauseKind, usize)> = vec![];

    let mut i = 0;
    while i < tokens.len() {
        if depths[i] == 0 {
            if let Some((kind, width)) = clause_at(tokens, i) {
                starts.push((i, kind, width));
                i += width;
                continue;
            }
        }
        i += 1;
    }

    match starts.first() {
        Some((0, ClauseKind::Select, _)) => {}
        _ => {
            let found = tokens
                .first()
                .cloned()
                .unwrap_or_else(|| Token::new(TokenKind::Eof, Span::default()));
            return Err(ParseError::unexpected("SELECT", &found).into());
        }
    }

    let mut segments: Vec<Segment<'_>> = Vec::with_capacity(starts.len());
    for (n, &(start, kind, width)) in starts.iter().enumerate() {
        let end = starts.get(n + 1).map_or(tokens.len(), |next| next.0);
        if !matches!(kind, ClauseKind::Join(_)) && segments.iter().any(|s| s.kind == kind) {
            return Err(SheetqlError::syntax(format!(
                "duplicate {} clause at position {}",
                kind.as_str(),
                tokens[start].span.start
            )));
        }
        segments.push(Segment {
            kind,
            keyword_span: tokens[start].span.merge(tokens[start + width - 1].span),
            tokens: &tokens[start + width..end],
        });
    }

    if !segments.iter().any(|s| s.kind == ClauseKind::From) {
        return Err(SheetqlError::syntax("missing FROM clause"));
    }

    Ok(segments)
}
