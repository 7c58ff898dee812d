//! INSERT and UPDATE builders.
//!
//! Both UPDATE shapes rewrite their source into a derived table and join the
//! target against it, so the SET clause only ever references two aliases.
//! Preconditions are checked at build time: a misconfigured statement fails
//! before any SQL is rendered.

use log::debug;

use crate::error::QueryError;
use crate::results::RowResult;

use super::context::RenderContext;
use super::dialect::SqlDialect;
use super::field::FieldVariable;
use super::literal::DataType;
use super::query::{Query, SelectExpression};
use super::table::{Aliases, TablePointer, TableVariable};
use super::token::{Token, TokenStream};

fn resolved_target(table: &TableVariable, ctx: &RenderContext) -> Result<String, QueryError> {
    match table.pointer() {
        TablePointer::Named(name) => Ok(ctx.resolve_table(name)),
        _ => Err(QueryError::InvalidConfig(
            "DML target must be a named table".into(),
        )),
    }
}

/// `INSERT INTO target (columns) SELECT ...`
///
/// The column list is the source query's output names; both sides are sorted
/// by name, so columns and select expressions line up positionally.
#[derive(Debug, Clone)]
pub struct InsertFromSelect {
    table: TableVariable,
    source: Query,
}

impl InsertFromSelect {
    pub fn new(table: TableVariable, source: Query) -> Self {
        Self { table, source }
    }

    pub fn render_sql(&self, ctx: &RenderContext) -> Result<String, QueryError> {
        let target = resolved_target(&self.table, ctx)?;
        let mut columns: Vec<&str> = self
            .source
            .select()
            .iter()
            .map(SelectExpression::alias_or_column)
            .collect();
        columns.sort_unstable();

        let mut ts = TokenStream::new();
        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .push(Token::Raw(target))
            .space()
            .lparen();
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident((*column).to_string()));
        }
        ts.rparen().space().append(&self.source.to_tokens(ctx)?);

        let sql = ts.serialize(ctx.dialect());
        debug!("rendered {} insert: {}", ctx.dialect(), sql);
        Ok(sql)
    }
}

/// `INSERT INTO target (columns) VALUES (...), (...)`
#[derive(Debug, Clone)]
pub struct InsertFromValues {
    table: TableVariable,
    rows: Vec<RowResult>,
}

impl InsertFromValues {
    pub fn new(table: TableVariable, rows: Vec<RowResult>) -> Result<Self, QueryError> {
        require_uniform_rows(&rows)?;
        Ok(Self { table, rows })
    }

    pub fn render_sql(&self, ctx: &RenderContext) -> Result<String, QueryError> {
        let target = resolved_target(&self.table, ctx)?;
        let schema = self.rows[0].schema();

        let mut ts = TokenStream::new();
        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .push(Token::Raw(target))
            .space()
            .lparen();
        for (i, column) in schema.columns().iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(column.name().to_string()));
        }
        ts.rparen()
            .space()
            .push(Token::Values)
            .space()
            .append(&super::dialect::helpers::emit_row_tuples(&row_tokens(
                &self.rows,
            )));

        let sql = ts.serialize(ctx.dialect());
        debug!("rendered {} insert: {}", ctx.dialect(), sql);
        Ok(sql)
    }
}

/// `UPDATE target SET ... FROM (select) WHERE join`
///
/// The source query is wrapped as a raw-SQL derived table; every set field
/// and the join condition read its output columns by name.
#[derive(Debug, Clone)]
pub struct UpdateFromSelect {
    table: TableVariable,
    /// Pairs of (target field, source field). The source side must be part
    /// of the source query's select list.
    set_fields: Vec<(FieldVariable, FieldVariable)>,
    source: Query,
    update_join_field: FieldVariable,
    source_join_field: FieldVariable,
}

impl UpdateFromSelect {
    pub fn new(
        table: TableVariable,
        set_fields: Vec<(FieldVariable, FieldVariable)>,
        source: Query,
        update_join_field: FieldVariable,
        source_join_field: FieldVariable,
    ) -> Result<Self, QueryError> {
        let selected: Vec<&str> = source
            .select()
            .iter()
            .map(SelectExpression::alias_or_column)
            .collect();
        if !selected.contains(&source_join_field.alias_or_column()) {
            return Err(QueryError::InvalidConfig(format!(
                "join field '{}' is not part of the source query's select list",
                source_join_field.alias_or_column()
            )));
        }
        for (_, source_field) in &set_fields {
            if !selected.contains(&source_field.alias_or_column()) {
                return Err(QueryError::InvalidConfig(format!(
                    "set field '{}' is not part of the source query's select list",
                    source_field.alias_or_column()
                )));
            }
        }
        Ok(Self {
            table,
            set_fields,
            source,
            update_join_field,
            source_join_field,
        })
    }

    pub fn render_sql(&self, ctx: &RenderContext) -> Result<String, QueryError> {
        let target = resolved_target(&self.table, ctx)?;
        let source_sql = self.source.to_tokens(ctx)?.serialize(ctx.dialect());
        let nested = TableVariable::for_primary(TablePointer::raw_sql(source_sql));
        let aliases = Aliases::generate(&[self.table.clone(), nested.clone()]);
        let target_alias = aliases.get(&self.table)?.to_string();
        let nested_alias = aliases.get(&nested)?.to_string();

        let mut assignments: Vec<(&FieldVariable, &FieldVariable)> = self
            .set_fields
            .iter()
            .map(|(target, source)| (target, source))
            .collect();
        assignments.sort_by(|a, b| a.0.pointer().column().cmp(b.0.pointer().column()));

        let mut ts = TokenStream::new();
        ts.push(Token::Update)
            .space()
            .push(Token::Raw(target))
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(target_alias.clone()))
            .space()
            .push(Token::Set)
            .space();
        for (i, (target_field, source_field)) in assignments.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&target_field.to_tokens(&aliases)?)
                .space()
                .push(Token::Eq)
                .space()
                .push(Token::Ident(nested_alias.clone()))
                .push(Token::Dot)
                .push(Token::Ident(source_field.alias_or_column().to_string()));
        }
        ts.space()
            .push(Token::From)
            .space()
            .append(&nested.to_from_tokens(ctx, &aliases)?)
            .space()
            .push(Token::Where)
            .space()
            .append(&self.update_join_field.to_tokens(&aliases)?)
            .space()
            .push(Token::Eq)
            .space()
            .push(Token::Ident(nested_alias))
            .push(Token::Dot)
            .push(Token::Ident(self.source_join_field.alias_or_column().to_string()));

        let sql = ts.serialize(ctx.dialect());
        debug!("rendered {} update: {}", ctx.dialect(), sql);
        Ok(sql)
    }
}

/// `UPDATE target SET ... FROM (literal rows) WHERE join`
///
/// The rows render as a typed values table in the dialect's shape (UNNEST of
/// a STRUCT array on BigQuery, a VALUES derived table on Synapse).
#[derive(Debug, Clone)]
pub struct UpdateFromValues {
    table: TableVariable,
    /// Pairs of (target field, source column name in the row schema).
    set_fields: Vec<(FieldVariable, String)>,
    rows: Vec<RowResult>,
    update_join_field: FieldVariable,
    source_join_column: String,
}

impl UpdateFromValues {
    pub fn new(
        table: TableVariable,
        set_fields: Vec<(FieldVariable, String)>,
        rows: Vec<RowResult>,
        update_join_field: FieldVariable,
        source_join_column: impl Into<String>,
    ) -> Result<Self, QueryError> {
        require_uniform_rows(&rows)?;
        let source_join_column = source_join_column.into();
        let schema = rows[0].schema();
        schema.index_of(&source_join_column)?;
        for (_, source_column) in &set_fields {
            schema.index_of(source_column)?;
        }
        Ok(Self {
            table,
            set_fields,
            rows,
            update_join_field,
            source_join_column,
        })
    }

    pub fn render_sql(&self, ctx: &RenderContext) -> Result<String, QueryError> {
        let target = resolved_target(&self.table, ctx)?;
        let schema = self.rows[0].schema();
        let aliases = Aliases::generate(std::slice::from_ref(&self.table));
        let target_alias = aliases.get(&self.table)?.to_string();
        let values_alias = if target_alias == "v" { "v0" } else { "v" };

        let columns: Vec<(&str, DataType)> = schema
            .columns()
            .iter()
            .map(|c| (c.name(), c.data_type()))
            .collect();
        let values_table =
            ctx.dialect()
                .emit_values_table(&columns, &row_tokens(&self.rows), values_alias);

        let mut assignments: Vec<(&FieldVariable, &str)> = self
            .set_fields
            .iter()
            .map(|(target, source)| (target, source.as_str()))
            .collect();
        assignments.sort_by(|a, b| a.0.pointer().column().cmp(b.0.pointer().column()));

        let mut ts = TokenStream::new();
        ts.push(Token::Update)
            .space()
            .push(Token::Raw(target))
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(target_alias))
            .space()
            .push(Token::Set)
            .space();
        for (i, (target_field, source_column)) in assignments.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&target_field.to_tokens(&aliases)?)
                .space()
                .push(Token::Eq)
                .space()
                .push(Token::Ident(values_alias.to_string()))
                .push(Token::Dot)
                .push(Token::Ident((*source_column).to_string()));
        }
        ts.space()
            .push(Token::From)
            .space()
            .append(&values_table)
            .space()
            .push(Token::Where)
            .space()
            .append(&self.update_join_field.to_tokens(&aliases)?)
            .space()
            .push(Token::Eq)
            .space()
            .push(Token::Ident(values_alias.to_string()))
            .push(Token::Dot)
            .push(Token::Ident(self.source_join_column.clone()));

        let sql = ts.serialize(ctx.dialect());
        debug!("rendered {} update: {}", ctx.dialect(), sql);
        Ok(sql)
    }
}

fn require_uniform_rows(rows: &[RowResult]) -> Result<(), QueryError> {
    let first = rows.first().ok_or_else(|| {
        QueryError::InvalidConfig("statement requires at least one row".into())
    })?;
    for row in &rows[1..] {
        if row.schema() != first.schema() {
            return Err(QueryError::Inconsistency(
                "all rows must share one schema".into(),
            ));
        }
    }
    Ok(())
}

/// Lower rows to literal tokens, one token per cell in schema column order.
fn row_tokens(rows: &[RowResult]) -> Vec<Vec<Token>> {
    rows.iter()
        .map(|row| {
            (0..row.schema().columns().len())
                .map(|i| match row.get(i).and_then(|cell| cell.literal()) {
                    Some(literal) => literal.to_token(),
                    None => Token::LitNull,
                })
                .collect()
        })
        .collect()
}
