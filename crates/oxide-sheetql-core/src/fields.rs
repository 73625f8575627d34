//! Per-query field registry.
//!
//! Every output column of a statement, plus the hidden columns needed to
//! satisfy `GROUP BY`, `HAVING` and `ORDER BY`, is one [`TableField`] in an
//! arena. Lookup indices map normalized spellings and `(source, column)`
//! pairs to arena slots. Joins re-point column fields to their position in
//! the derived table without touching their spellings.

use std::collections::HashMap;

use crate::ast::{Expr, Literal, SelectField, SelectStatement};
use crate::error::{Result, SheetqlError};
use crate::table::{normalize_name, Schema, Table};

/// Grouping aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Count,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    /// Looks an aggregate up by name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUM" => Some(Self::Sum),
            "COUNT" => Some(Self::Count),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            "AVG" => Some(Self::Avg),
            _ => None,
        }
    }
}

/// An aggregate applied to a field's per-row value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    /// Fold each distinct value once.
    pub distinct: bool,
}

/// Where a field's per-row value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A physical column of one of the statement's sources.
    Column {
        /// Source index: 0 is `FROM`, `n` is the n-th `JOIN`.
        source: usize,
        /// Column index within that source.
        column: usize,
    },
    /// A scalar expression evaluated per row.
    Calculated(Expr),
    /// A scalar subquery, possibly correlated with the current row.
    Subquery(Box<SelectStatement>),
    /// The `*` of `COUNT(*)`.
    Star,
}

/// One logical column of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TableField {
    pub kind: FieldKind,
    pub aggregate: Option<Aggregate>,
    /// Output title.
    pub title: String,
    /// Every normalized spelling this field answers to.
    pub spellings: Vec<String>,
    /// Added only to resolve another clause; dropped from the output.
    pub temporary: bool,
    derived: Option<usize>,
}

impl TableField {
    fn new(kind: FieldKind, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            kind,
            aggregate: None,
            spellings: vec![normalize_name(&title)],
            title,
            temporary: false,
            derived: None,
        }
    }

    fn spell(&mut self, spelling: &str) {
        let spelling = normalize_name(spelling);
        if !spelling.is_empty() && !self.spellings.contains(&spelling) {
            self.spellings.push(spelling);
        }
    }

    /// Column of the working table holding this field, for column fields.
    #[must_use]
    pub fn physical(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Column { column, .. } => Some(self.derived.unwrap_or(column)),
            _ => None,
        }
    }

    /// Returns true if this field is folded by an aggregate.
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }
}

/// Builds the spelling used to look a possibly qualified column up in a
/// schema.
#[must_use]
pub fn column_spelling(table: Option<&str>, name: &str) -> String {
    table.map_or_else(|| name.to_string(), |t| format!("{t}.{name}"))
}

/// Finds the first source that knows the column.
#[must_use]
pub fn resolve_column(sources: &[Table], table: Option<&str>, name: &str) -> Option<(usize, usize)> {
    let spelling = column_spelling(table, name);
    sources
        .iter()
        .enumerate()
        .find_map(|(index, source)| source.column(&spelling).map(|column| (index, column)))
}

/// Arena of fields with lookup indices.
#[derive(Debug, Clone, Default)]
pub struct TableFields {
    fields: Vec<TableField>,
    by_name: HashMap<String, usize>,
    by_column: HashMap<(usize, usize), usize>,
}

impl TableFields {
    /// Classifies the `SELECT` list against the statement's sources.
    ///
    /// # Errors
    ///
    /// Fails with a schema error for unknown columns and a syntax error
    /// for aggregates that are not the outermost call of a field.
    pub fn from_select(select: &[SelectField], sources: &[Table]) -> Result<Self> {
        let mut registry = Self::default();
        for field in select {
            if let Expr::Wildcard { table } = &field.expr {
                registry.expand_wildcard(table.as_deref(), sources)?;
                continue;
            }
            let mut entry = classify(&field.expr, field.title(), sources)?;
            entry.spell(&field.expr.to_string());
            registry.push(entry);
        }
        Ok(registry)
    }

    fn expand_wildcard(&mut self, qualifier: Option<&str>, sources: &[Table]) -> Result<()> {
        let mut matched = false;
        for (index, source) in sources.iter().enumerate() {
            if let Some(qualifier) = qualifier {
                let wanted = normalize_name(qualifier);
                if normalize_name(source.reference_name()) != wanted
                    && normalize_name(source.name()) != wanted
                {
                    continue;
                }
            }
            matched = true;
            for (column, title) in source.titles().iter().enumerate() {
                let title = normalize_name(&format!("{}.{title}", source.reference_name()));
                let mut field = TableField::new(
                    FieldKind::Column {
                        source: index,
                        column,
                    },
                    title,
                );
                spell_column(&mut field, source, column);
                self.push(field);
            }
        }
        if matched {
            Ok(())
        } else {
            Err(SheetqlError::schema(format!(
                "unknown table {} in SELECT",
                qualifier.unwrap_or_default()
            )))
        }
    }

    fn push(&mut self, field: TableField) -> usize {
        let slot = self.fields.len();
        for spelling in &field.spellings {
            self.by_name.entry(spelling.clone()).or_insert(slot);
        }
        if field.aggregate.is_none() {
            if let FieldKind::Column { source, column } = field.kind {
                self.by_column.entry((source, column)).or_insert(slot);
            }
        }
        self.fields.push(field);
        slot
    }

    /// Finds the field an expression refers to: by title or spelling, by
    /// canonical rendering, or by the resolved source column.
    #[must_use]
    pub fn find(&self, expr: &Expr, sources: &[Table]) -> Option<usize> {
        if let Some(&slot) = self.by_name.get(&normalize_name(&expr.to_string())) {
            return Some(slot);
        }
        match expr {
            Expr::Column { table, name } => {
                if let Some(&slot) = self.by_name.get(&normalize_name(name)).filter(|_| table.is_none()) {
                    return Some(slot);
                }
                let key = resolve_column(sources, table.as_deref(), name)?;
                self.by_column.get(&key).copied()
            }
            Expr::Paren(inner) => self.find(inner, sources),
            _ => None,
        }
    }

    /// Returns the selected field at a 1-based ordinal when `expr` is an
    /// integer literal.
    ///
    /// # Errors
    ///
    /// Fails with a syntax error for an out-of-range ordinal.
    pub fn ordinal(&self, expr: &Expr, clause: &str) -> Result<Option<usize>> {
        let Expr::Literal(Literal::Number(n)) = expr else {
            return Ok(None);
        };
        #[allow(clippy::cast_precision_loss)]
        let selected = self.selected_len() as f64;
        if n.fract() != 0.0 || *n < 1.0 || *n > selected {
            return Err(SheetqlError::syntax(format!(
                "{clause} position {expr} is not in the select list"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let position = *n as usize;
        Ok(Some(position - 1))
    }

    /// Finds the field for a `GROUP BY`, `HAVING` or `ORDER BY` reference,
    /// appending it as a temporary field when it is not selected.
    ///
    /// # Errors
    ///
    /// Fails with a syntax error when a column cannot be resolved against
    /// any source.
    pub fn resolve_or_add(&mut self, expr: &Expr, sources: &[Table], clause: &str) -> Result<usize> {
        if let Some(slot) = self.ordinal(expr, clause)? {
            return Ok(slot);
        }
        if let Some(slot) = self.find(expr, sources) {
            return Ok(slot);
        }
        if let Expr::Column { table, name } = expr {
            if resolve_column(sources, table.as_deref(), name).is_none() {
                return Err(SheetqlError::syntax(format!(
                    "unknown {clause} column {expr}"
                )));
            }
        }
        let mut field = classify(expr, &expr.to_string(), sources).map_err(|err| match err {
            SheetqlError::Schema(message) => {
                SheetqlError::syntax(format!("{clause}: {message}"))
            }
            other => other,
        })?;
        field.temporary = true;
        tracing::trace!(clause, field = %field.title, "added temporary field");
        Ok(self.push(field))
    }

    /// Points every column field of `source` at `offset + column` in the
    /// derived table.
    pub fn repoint(&mut self, source: usize, offset: usize) {
        for field in &mut self.fields {
            if let FieldKind::Column { source: s, column } = field.kind {
                if s == source {
                    field.derived = Some(offset + column);
                }
            }
        }
    }

    /// All fields, selected ones first.
    pub fn iter(&self) -> impl Iterator<Item = &TableField> {
        self.fields.iter()
    }

    /// The field in a slot.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&TableField> {
        self.fields.get(slot)
    }

    /// Number of fields, temporaries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields that appear in the output.
    #[must_use]
    pub fn selected_len(&self) -> usize {
        self.fields.iter().filter(|f| !f.temporary).count()
    }

    /// Returns true if any field is an aggregate.
    #[must_use]
    pub fn has_aggregates(&self) -> bool {
        self.fields.iter().any(TableField::is_aggregate)
    }

    /// Output titles.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.temporary)
            .map(|f| f.title.clone())
            .collect()
    }

    /// A schema addressing every field by any of its spellings, used to
    /// evaluate conditions over computed rows.
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema::from_spellings(
            self.fields
                .iter()
                .enumerate()
                .flat_map(|(slot, f)| f.spellings.iter().map(move |s| (s.as_str(), slot))),
        )
    }
}

fn spell_column(field: &mut TableField, source: &Table, column: usize) {
    if let Some(title) = source.titles().get(column) {
        field.spell(title);
        field.spell(&format!("{}.{title}", source.name()));
        if let Some(alias) = source.alias() {
            field.spell(&format!("{alias}.{title}"));
        }
    }
}

/// Classifies one expression as a column, aggregate, subquery or
/// calculated field.
fn classify(expr: &Expr, title: &str, sources: &[Table]) -> Result<TableField> {
    if let Some(call) = expr.as_aggregate() {
        let Some(function) = AggregateFunction::from_name(&call.name) else {
            return Err(SheetqlError::Internal(format!("unknown aggregate {}", call.name)));
        };
        let [argument] = call.args.as_slice() else {
            return Err(SheetqlError::syntax(format!(
                "{} expects exactly one argument",
                call.name
            )));
        };
        let mut field = classify_value(argument, title, sources)?;
        field.spellings = vec![normalize_name(title)];
        field.aggregate = Some(Aggregate {
            function,
            distinct: call.distinct,
        });
        return Ok(field);
    }
    classify_value(expr, title, sources)
}

fn classify_value(expr: &Expr, title: &str, sources: &[Table]) -> Result<TableField> {
    match expr {
        Expr::Wildcard { table: None } => Ok(TableField::new(FieldKind::Star, title)),
        Expr::Wildcard { table: Some(_) } => Err(SheetqlError::syntax(format!(
            "{expr} is only allowed as a whole select field"
        ))),
        Expr::Column { table, name } => {
            let (source, column) = resolve_column(sources, table.as_deref(), name)
                .ok_or_else(|| SheetqlError::schema(format!("unknown column {expr}")))?;
            let mut field = TableField::new(FieldKind::Column { source, column }, title);
            spell_column(&mut field, &sources[source], column);
            Ok(field)
        }
        Expr::Subquery(query) => Ok(TableField::new(FieldKind::Subquery(query.clone()), title)),
        _ if expr.contains_aggregate() => Err(SheetqlError::syntax(format!(
            "aggregate functions must be the outermost call of a field: {expr}"
        ))),
        _ => Ok(TableField::new(FieldKind::Calculated(expr.clone()), title)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::Value;

    fn sources() -> Vec<Table> {
        let books = Table::new(
            "books",
            vec![
                vec!["id".into(), "title".into(), "author_id".into()],
                vec![1.into(), "A".into(), 11.into()],
            ],
        )
        .unwrap()
        .with_alias(Some("b"));
        let authors = Table::new(
            "authors",
            vec![vec![Value::from("id"), Value::from("last_name")]],
        )
        .unwrap()
        .with_alias(None);
        vec![books, authors]
    }

    fn registry(sql: &str) -> TableFields {
        let stmt = parse(sql).unwrap();
        TableFields::from_select(&stmt.fields, &sources()).unwrap()
    }

    #[test]
    fn test_classifies_fields() {
        let fields = registry("SELECT b.id, COUNT(*), price * 2 AS double, (SELECT 1 FROM t) FROM books b");
        let kinds: Vec<_> = fields.iter().map(|f| &f.kind).collect();
        assert_eq!(kinds[0], &FieldKind::Column { source: 0, column: 0 });
        assert_eq!(kinds[1], &FieldKind::Star);
        assert!(matches!(kinds[2], FieldKind::Calculated(_)));
        assert!(matches!(kinds[3], FieldKind::Subquery(_)));
        assert_eq!(
            fields.get(1).unwrap().aggregate.unwrap().function,
            AggregateFunction::Count
        );
        assert_eq!(fields.get(2).unwrap().title, "double");
    }

    #[test]
    fn test_wildcard_expands_every_source() {
        let fields = registry("SELECT * FROM books b");
        assert_eq!(
            fields.titles(),
            vec!["B.ID", "B.TITLE", "B.AUTHOR_ID", "AUTHORS.ID", "AUTHORS.LAST_NAME"]
        );
        let qualified = registry("SELECT authors.* FROM books b");
        assert_eq!(qualified.titles(), vec!["AUTHORS.ID", "AUTHORS.LAST_NAME"]);
    }

    #[test]
    fn test_unknown_column_is_schema_error() {
        let stmt = parse("SELECT nope FROM books").unwrap();
        let err = TableFields::from_select(&stmt.fields, &sources()).unwrap_err();
        assert!(matches!(err, SheetqlError::Schema(_)));
    }

    #[test]
    fn test_nested_aggregate_is_syntax_error() {
        let stmt = parse("SELECT SUM(id) + 1 FROM books").unwrap();
        let err = TableFields::from_select(&stmt.fields, &sources()).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_find_by_every_spelling() {
        let srcs = sources();
        let fields = registry("SELECT b.title AS name FROM books b");
        assert_eq!(fields.find(&Expr::column("name"), &srcs), Some(0));
        assert_eq!(fields.find(&Expr::column("title"), &srcs), Some(0));
        assert_eq!(fields.find(&Expr::qualified_column("books", "title"), &srcs), Some(0));
    }

    #[test]
    fn test_unselected_order_column_becomes_temporary() {
        let srcs = sources();
        let mut fields = registry("SELECT title FROM books b");
        let slot = fields
            .resolve_or_add(&Expr::column("author_id"), &srcs, "ORDER BY")
            .unwrap();
        assert_eq!(slot, 1);
        assert!(fields.get(1).unwrap().temporary);
        assert_eq!(fields.titles(), vec!["title"]);
        let err = fields
            .resolve_or_add(&Expr::column("missing"), &srcs, "ORDER BY")
            .unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_ordinal_refers_to_selected_fields() {
        let fields = registry("SELECT id, title FROM books b");
        assert_eq!(fields.ordinal(&Expr::number(2.0), "ORDER BY").unwrap(), Some(1));
        assert!(fields.ordinal(&Expr::number(3.0), "ORDER BY").is_err());
    }

    #[test]
    fn test_repoint_shifts_columns() {
        let mut fields = registry("SELECT authors.last_name, b.id FROM books b");
        assert_eq!(fields.get(0).unwrap().physical(), Some(1));
        fields.repoint(1, 3);
        assert_eq!(fields.get(0).unwrap().physical(), Some(4));
        assert_eq!(fields.get(1).unwrap().physical(), Some(0));
    }
}
