//! Clause analyzers: turn split segments into a [`SelectStatement`].

use super::error::ParseError;
use super::expression::ExprParser;
use super::splitter::{split_clauses, split_set_operations, ClauseKind, Segment};
use crate::ast::{
    Expr, JoinClause, OrderBy, OrderDirection, SelectField, SelectStatement, SetOperation,
    TableSource,
};
use crate::error::{Result, SheetqlError};
use crate::lexer::{Keyword, Token, TokenKind};

/// Parses a full statement, set operations included. `end` is the byte
/// offset used for errors at the end of an empty slice.
pub(crate) fn parse_select(source: &str, tokens: &[Token], end: usize) -> Result<SelectStatement> {
    let mut operands = split_set_operations(tokens)?.into_iter();
    let Some((_, first)) = operands.next() else {
        return Err(SheetqlError::syntax("empty statement"));
    };
    let mut statement = parse_single(source, first, end)?;
    for (operator, tokens) in operands {
        let Some(operator) = operator else {
            return Err(SheetqlError::Internal(
                "set operand without operator".into(),
            ));
        };
        statement.set_operations.push(SetOperation {
            operator,
            statement: parse_single(source, tokens, end)?,
        });
    }
    Ok(statement)
}

/// Parses one SELECT without set operators.
fn parse_single(source: &str, tokens: &[Token], end: usize) -> Result<SelectStatement> {
    let segments = split_clauses(tokens)?;

    let mut distinct = false;
    let mut fields = vec![];
    let mut from = None;
    let mut joins = vec![];
    let mut where_clause = None;
    let mut group_by = vec![];
    let mut having = None;
    let mut order_by = vec![];
    let mut limit = None;
    let mut pivot = None;

    for segment in &segments {
        let mut parser = ExprParser::new(source, segment.tokens, segment.keyword_span.end);
        match segment.kind {
            ClauseKind::Select => {
                (distinct, fields) = parse_select_list(&mut parser)?;
            }
            ClauseKind::From => from = Some(parse_table_source(&mut parser)?),
            ClauseKind::Join(join_type) => {
                let table = parse_table_source(&mut parser)?;
                parser.expect_keyword(Keyword::On)?;
                let condition = parser.parse_condition()?;
                joins.push(JoinClause {
                    join_type,
                    source: table,
                    condition,
                });
            }
            ClauseKind::Where => where_clause = Some(parser.parse_condition()?),
            ClauseKind::GroupBy => group_by = parse_expr_list(&mut parser)?,
            ClauseKind::Having => having = Some(parser.parse_condition()?),
            ClauseKind::OrderBy => order_by = parse_order_by(&mut parser)?,
            ClauseKind::Limit => limit = Some(parse_limit(&mut parser, segment)?),
            ClauseKind::Pivot => pivot = Some(parser.parse_expr(0)?),
        }
        parser.expect_end()?;
    }

    let Some(from) = from else {
        return Err(SheetqlError::syntax(format!(
            "missing FROM clause at position {end}"
        )));
    };

    Ok(SelectStatement {
        distinct,
        fields,
        from,
        joins,
        where_clause,
        group_by,
        having,
        order_by,
        limit,
        pivot,
        set_operations: vec![],
    })
}

/// `[DISTINCT | ALL] field [[AS] alias] (, field [[AS] alias])*`
fn parse_select_list(parser: &mut ExprParser<'_, '_>) -> Result<(bool, Vec<SelectField>)> {
    let distinct = if parser.check_keyword(Keyword::Distinct) {
        parser.advance();
        true
    } else {
        if parser.check_keyword(Keyword::All) {
            parser.advance();
        }
        false
    };

    let mut fields = vec![];
    loop {
        let start = parser.position();
        let expr = parser.parse_expr(0)?;
        let text = parser.source_text(start);

        let alias = if parser.check_keyword(Keyword::As) {
            parser.advance();
            Some(parser.expect_name("alias")?)
        } else if matches!(parser.current().kind, TokenKind::Identifier(_)) {
            Some(parser.expect_name("alias")?)
        } else {
            None
        };

        fields.push(SelectField { expr, text, alias });

        if !parser.check(&TokenKind::Comma) {
            break;
        }
        parser.advance();
    }
    Ok((distinct, fields))
}

fn parse_optional_alias(parser: &mut ExprParser<'_, '_>) -> Result<Option<String>> {
    if parser.check_keyword(Keyword::As) {
        parser.advance();
        return Ok(Some(parser.expect_name("alias")?));
    }
    if matches!(parser.current().kind, TokenKind::Identifier(_)) {
        return Ok(Some(parser.expect_name("alias")?));
    }
    Ok(None)
}

/// `name [[AS] alias]` or `( SELECT ... ) [[AS] alias]`
fn parse_table_source(parser: &mut ExprParser<'_, '_>) -> Result<TableSource> {
    if parser.check(&TokenKind::LeftParen) {
        let query = parser.parse_parenthesized_select()?;
        let alias = parse_optional_alias(parser)?;
        return Ok(TableSource::Subquery {
            query: Box::new(query),
            alias,
        });
    }
    let name = parser.expect_name("table name")?;
    let alias = parse_optional_alias(parser)?;
    Ok(TableSource::Table { name, alias })
}

fn parse_expr_list(parser: &mut ExprParser<'_, '_>) -> Result<Vec<Expr>> {
    let mut items = vec![];
    loop {
        items.push(parser.parse_expr(0)?);
        if !parser.check(&TokenKind::Comma) {
            break;
        }
        parser.advance();
    }
    Ok(items)
}

fn parse_order_by(parser: &mut ExprParser<'_, '_>) -> Result<Vec<OrderBy>> {
    let mut items = vec![];
    loop {
        let expr = parser.parse_expr(0)?;
        let direction = if parser.check_keyword(Keyword::Desc) {
            parser.advance();
            OrderDirection::Desc
        } else {
            if parser.check_keyword(Keyword::Asc) {
                parser.advance();
            }
            OrderDirection::Asc
        };
        items.push(OrderBy { expr, direction });
        if !parser.check(&TokenKind::Comma) {
            break;
        }
        parser.advance();
    }
    Ok(items)
}

fn parse_limit(parser: &mut ExprParser<'_, '_>, segment: &Segment<'_>) -> Result<usize> {
    let token = parser.advance();
    match token.kind {
        TokenKind::Integer(n) => usize::try_from(n).map_err(|_| {
            SheetqlError::from(ParseError::new("LIMIT must not be negative", token.span))
        }),
        _ => Err(SheetqlError::syntax(format!(
            "LIMIT expects a row count at position {}",
            segment.keyword_span.end
        ))),
    }
}
