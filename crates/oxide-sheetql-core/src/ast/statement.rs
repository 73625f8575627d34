//! SELECT statement AST types.

use std::fmt;

use super::expression::write_ident;
use super::{Condition, Expr};

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ORDER BY clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The expression to order by. An integer literal is a 1-based
    /// select-list ordinal.
    pub expr: Expr,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN (also a bare JOIN).
    Inner,
    /// LEFT OUTER JOIN.
    Left,
    /// RIGHT OUTER JOIN.
    Right,
    /// FULL OUTER JOIN.
    Full,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
        }
    }
}

/// A table operand of FROM or JOIN.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// A named table from the table map.
    Table {
        /// Table name.
        name: String,
        /// Alias.
        alias: Option<String>,
    },
    /// A subquery materialized as a table.
    Subquery {
        /// The subquery.
        query: Box<SelectStatement>,
        /// Alias.
        alias: Option<String>,
    },
}

impl TableSource {
    /// Creates a simple table reference.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            name: name.into(),
            alias: None,
        }
    }

    /// Returns the alias, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Table { alias, .. } | Self::Subquery { alias, .. } => alias.as_deref(),
        }
    }

    /// Returns the name the source is referenced by: the alias when set,
    /// otherwise the table name.
    #[must_use]
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            Self::Table { name, alias } => Some(alias.as_deref().unwrap_or(name)),
            Self::Subquery { alias, .. } => alias.as_deref(),
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// The type of join.
    pub join_type: JoinType,
    /// The joined table.
    pub source: TableSource,
    /// The ON condition.
    pub condition: Condition,
}

/// A SELECT list item.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectField {
    /// The expression.
    pub expr: Expr,
    /// The expression as written in the query.
    pub text: String,
    /// Alias from `AS alias` (or a bare trailing identifier).
    pub alias: Option<String>,
}

impl SelectField {
    /// Creates a field whose text is the canonical rendering of `expr`.
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        let text = expr.to_string();
        Self {
            expr,
            text,
            alias: None,
        }
    }

    /// Creates an aliased field.
    #[must_use]
    pub fn with_alias(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::new(expr)
        }
    }

    /// Returns the column title: the alias when present, otherwise the
    /// text as written.
    #[must_use]
    pub fn title(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.text)
    }
}

/// Set operators combining two SELECT results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOperator {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// A set operator and its right operand.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    /// The operator.
    pub operator: SetOperator,
    /// The right operand.
    pub statement: SelectStatement,
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Whether DISTINCT was specified.
    pub distinct: bool,
    /// Selected fields.
    pub fields: Vec<SelectField>,
    /// FROM source.
    pub from: TableSource,
    /// JOIN clauses, in source order.
    pub joins: Vec<JoinClause>,
    /// WHERE clause.
    pub where_clause: Option<Condition>,
    /// GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// HAVING clause.
    pub having: Option<Condition>,
    /// ORDER BY entries.
    pub order_by: Vec<OrderBy>,
    /// LIMIT row count.
    pub limit: Option<usize>,
    /// PIVOT column.
    pub pivot: Option<Expr>,
    /// Set operations applied left to right to this statement's result.
    pub set_operations: Vec<SetOperation>,
}

impl SelectStatement {
    /// Creates `SELECT <fields> FROM <from>` with no other clauses.
    #[must_use]
    pub const fn new(fields: Vec<SelectField>, from: TableSource) -> Self {
        Self {
            distinct: false,
            fields,
            from,
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            pivot: None,
            set_operations: Vec::new(),
        }
    }

    /// Visits every expression in the statement, nested statements
    /// included.
    pub fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        for field in &self.fields {
            field.expr.walk(f);
        }
        if let TableSource::Subquery { query, .. } = &self.from {
            query.walk(f);
        }
        for join in &self.joins {
            if let TableSource::Subquery { query, .. } = &join.source {
                query.walk(f);
            }
            join.condition.walk(f);
        }
        if let Some(condition) = &self.where_clause {
            condition.walk(f);
        }
        self.group_by.iter().for_each(|e| e.walk(f));
        if let Some(condition) = &self.having {
            condition.walk(f);
        }
        self.order_by.iter().for_each(|o| o.expr.walk(f));
        if let Some(pivot) = &self.pivot {
            pivot.walk(f);
        }
        for op in &self.set_operations {
            op.statement.walk(f);
        }
    }

    /// Returns the highest bind placeholder referenced anywhere in the
    /// statement, or 0 when there is none.
    #[must_use]
    pub fn max_bind(&self) -> usize {
        let mut max = 0;
        self.walk(&mut |e| {
            if let Expr::Bind(n) = e {
                max = max.max(*n);
            }
        });
        max
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = match self {
            Self::Table { name, alias } => {
                write_ident(f, name)?;
                alias
            }
            Self::Subquery { query, alias } => {
                write!(f, "({query})")?;
                alias
            }
        };
        if let Some(alias) = alias {
            f.write_str(" AS ")?;
            write_ident(f, alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field.expr)?;
            if let Some(alias) = &field.alias {
                f.write_str(" AS ")?;
                write_ident(f, alias)?;
            }
        }
        write!(f, " FROM {}", self.from)?;
        for join in &self.joins {
            write!(
                f,
                " {} {} ON {}",
                join.join_type.as_str(),
                join.source,
                join.condition
            )?;
        }
        if let Some(condition) = &self.where_clause {
            write!(f, " WHERE {condition}")?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            for (i, e) in self.group_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{e}")?;
            }
        }
        if let Some(condition) = &self.having {
            write!(f, " HAVING {condition}")?;
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, o) in self.order_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} {}", o.expr, o.direction.as_str())?;
            }
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(pivot) = &self.pivot {
            write!(f, " PIVOT {pivot}")?;
        }
        for op in &self.set_operations {
            write!(f, " {} {}", op.operator.as_str(), op.statement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CompareOp;

    #[test]
    fn test_field_title_prefers_alias() {
        let field = SelectField::with_alias(Expr::column("id"), "ident");
        assert_eq!(field.title(), "ident");
        assert_eq!(SelectField::new(Expr::column("id")).title(), "id");
    }

    #[test]
    fn test_reference_name() {
        let source = TableSource::Table {
            name: "books".into(),
            alias: Some("b".into()),
        };
        assert_eq!(source.reference_name(), Some("b"));
        assert_eq!(TableSource::table("books").reference_name(), Some("books"));
    }

    #[test]
    fn test_display_statement() {
        let mut stmt = SelectStatement::new(
            vec![SelectField::new(Expr::column("id"))],
            TableSource::table("books"),
        );
        stmt.where_clause = Some(Condition::compare(
            Expr::column("id"),
            CompareOp::Gt,
            Expr::Bind(1),
        ));
        stmt.limit = Some(2);
        assert_eq!(
            stmt.to_string(),
            "SELECT id FROM books WHERE id > ?1 LIMIT 2"
        );
        assert_eq!(stmt.max_bind(), 1);
    }
}
