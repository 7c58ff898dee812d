//! Tables: pointers, per-query occurrences, and alias assignment.
//!
//! A [`TablePointer`] names a table; a [`TableVariable`] is one occurrence of
//! a pointer inside one query (the same pointer can appear several times,
//! e.g. `concept_ancestor` joined twice). Aliases belong to a render pass,
//! not to the AST: [`Aliases`] is computed fresh for each rendering, so the
//! same query can be rendered repeatedly with identical output.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::QueryError;

use super::context::RenderContext;
use super::field::{FieldPointer, FieldVariable};
use super::filter::Filter;
use super::query::Query;
use super::token::{Token, TokenStream};

static NEXT_TABLE_VARIABLE_ID: AtomicU64 = AtomicU64::new(0);

/// A reference to a table: by name, by raw SQL, or by name with an embedded
/// row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum TablePointer {
    /// A logical table name, resolved through the render context.
    Named(String),
    /// A pre-rendered SQL fragment used as a derived table.
    RawSql(String),
    /// A named table restricted by a filter; renders as a derived table
    /// `(SELECT a.* FROM name AS a WHERE ...)`.
    Filtered { name: String, filter: Filter },
}

impl TablePointer {
    pub fn named(name: impl Into<String>) -> Self {
        TablePointer::Named(name.into())
    }

    pub fn raw_sql(sql: impl Into<String>) -> Self {
        TablePointer::RawSql(sql.into())
    }

    pub fn filtered(name: impl Into<String>, filter: Filter) -> Self {
        TablePointer::Filtered {
            name: name.into(),
            filter,
        }
    }

    /// The logical table name, if this pointer has one.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            TablePointer::Named(name) => Some(name),
            TablePointer::Filtered { name, .. } => Some(name),
            TablePointer::RawSql(_) => None,
        }
    }

    /// Preferred alias stem: lowercased first letter of the table name for
    /// plain named tables, `t` for derived tables (raw SQL or filtered).
    pub(crate) fn default_alias(&self) -> String {
        match self {
            TablePointer::Named(name) => name
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase().to_string())
                .unwrap_or_else(|| "t".to_string()),
            TablePointer::RawSql(_) | TablePointer::Filtered { .. } => "t".to_string(),
        }
    }

    pub(crate) fn to_tokens(&self, ctx: &RenderContext) -> Result<TokenStream, QueryError> {
        let mut ts = TokenStream::new();
        match self {
            TablePointer::Named(name) => {
                ts.push(Token::Raw(ctx.resolve_table(name)));
            }
            TablePointer::RawSql(sql) => {
                ts.lparen().push(Token::Raw(sql.clone())).rparen();
            }
            TablePointer::Filtered { name, filter } => {
                let inner = TableVariable::for_primary(TablePointer::named(name.clone()));
                let mut tables = vec![inner.clone()];
                let filter_variable = filter.build_variable(&inner, &mut tables);
                let select = FieldVariable::new(
                    FieldPointer::all_fields(TablePointer::named(name.clone())),
                    &inner,
                    None,
                );
                let query = Query::new(vec![select], tables).with_where(filter_variable);
                ts.lparen().append(&query.to_tokens(ctx)?).rparen();
            }
        }
        Ok(ts)
    }
}

/// A JOIN binding one table occurrence to a field of another.
#[derive(Debug, Clone)]
pub struct JoinClause {
    /// Column of the joined table used in the ON condition.
    pub(crate) column: String,
    /// Field of some other table the ON condition equates against.
    pub(crate) on_field: Box<FieldVariable>,
    pub(crate) left_join: bool,
}

/// One occurrence of a table inside one query.
///
/// Identity is the occurrence, not the pointer: cloning keeps the identity,
/// constructing makes a new one. A variable with no join clause is the
/// query's primary table.
#[derive(Debug, Clone)]
pub struct TableVariable {
    id: u64,
    pointer: TablePointer,
    join: Option<JoinClause>,
}

impl PartialEq for TableVariable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TableVariable {}

impl TableVariable {
    fn next_id() -> u64 {
        NEXT_TABLE_VARIABLE_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// A primary (FROM-clause) occurrence of `pointer`.
    pub fn for_primary(pointer: TablePointer) -> Self {
        Self {
            id: Self::next_id(),
            pointer,
            join: None,
        }
    }

    /// An inner-joined occurrence: `JOIN pointer AS a ON a.column = on_field`.
    pub fn for_joined(pointer: TablePointer, column: impl Into<String>, on_field: FieldVariable) -> Self {
        Self {
            id: Self::next_id(),
            pointer,
            join: Some(JoinClause {
                column: column.into(),
                on_field: Box::new(on_field),
                left_join: false,
            }),
        }
    }

    /// A left-joined occurrence, for joins that may match no rows.
    pub fn for_left_joined(
        pointer: TablePointer,
        column: impl Into<String>,
        on_field: FieldVariable,
    ) -> Self {
        Self {
            id: Self::next_id(),
            pointer,
            join: Some(JoinClause {
                column: column.into(),
                on_field: Box::new(on_field),
                left_join: true,
            }),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn pointer(&self) -> &TablePointer {
        &self.pointer
    }

    pub fn is_primary(&self) -> bool {
        self.join.is_none()
    }

    pub(crate) fn join(&self) -> Option<&JoinClause> {
        self.join.as_ref()
    }

    /// A plain field of this table occurrence.
    pub fn make_field_variable(&self, column: impl Into<String>) -> FieldVariable {
        FieldVariable::new(
            FieldPointer::new(self.pointer.clone(), column),
            self,
            None,
        )
    }

    /// A field with an explicit output alias, e.g.
    /// `a.concept_id_1 AS parent_id`.
    pub fn make_aliased_field(
        &self,
        column: impl Into<String>,
        alias: impl Into<String>,
    ) -> FieldVariable {
        let alias = alias.into();
        FieldVariable::new(
            FieldPointer::new(self.pointer.clone(), column),
            self,
            Some(&alias),
        )
    }

    /// A function-wrapped, aliased field, e.g.
    /// `COUNT(DISTINCT a.person_id) AS count`.
    pub fn make_wrapped_field(
        &self,
        column: impl Into<String>,
        wrapper: impl Into<String>,
        alias: impl Into<String>,
        distinct: bool,
    ) -> FieldVariable {
        let pointer =
            FieldPointer::new(self.pointer.clone(), column).with_function_wrapper(wrapper);
        let alias = alias.into();
        let mut field = FieldVariable::new(pointer, self, Some(&alias));
        if distinct {
            field = field.with_distinct();
        }
        field
    }

    /// Render for FROM position: `<pointer> AS <alias>`.
    pub(crate) fn to_from_tokens(
        &self,
        ctx: &RenderContext,
        aliases: &Aliases,
    ) -> Result<TokenStream, QueryError> {
        let mut ts = self.pointer.to_tokens(ctx)?;
        ts.space()
            .push(Token::As)
            .space()
            .push(Token::Ident(aliases.get(self)?.to_string()));
        Ok(ts)
    }

    /// Render as a JOIN clause:
    /// `[LEFT ]JOIN <pointer> AS <alias> ON <alias>.<column> = <on_field>`.
    pub(crate) fn to_join_tokens(
        &self,
        ctx: &RenderContext,
        aliases: &Aliases,
    ) -> Result<TokenStream, QueryError> {
        let join = self.join.as_ref().ok_or_else(|| {
            QueryError::Inconsistency(format!(
                "table '{}' has no join clause",
                self.pointer.table_name().unwrap_or("<raw>")
            ))
        })?;
        let alias = aliases.get(self)?.to_string();

        let mut ts = TokenStream::new();
        if join.left_join {
            ts.push(Token::Left).space();
        }
        ts.push(Token::Join)
            .space()
            .append(&self.pointer.to_tokens(ctx)?)
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.clone()))
            .space()
            .push(Token::On)
            .space()
            .push(Token::Ident(alias))
            .push(Token::Dot)
            .push(Token::Ident(join.column.clone()))
            .space()
            .push(Token::Eq)
            .space()
            .append(&join.on_field.to_tokens(aliases)?);
        Ok(ts)
    }
}

/// Append `table` (and the tables its join condition references) to `out`,
/// skipping occurrences already present.
///
/// The ON-condition dependency is pushed first, so a chain discovered
/// through a filter still renders its JOINs in dependency order.
pub(crate) fn collect_table(table: &TableVariable, out: &mut Vec<TableVariable>) {
    if out.iter().any(|t| t.id == table.id) {
        return;
    }
    if let Some(join) = &table.join {
        collect_table(join.on_field.table(), out);
    }
    out.push(table.clone());
}

/// Immutable table-alias assignment for one render pass.
///
/// Aliases are assigned in list order: each table gets the lowercased first
/// letter of its name (`t` for unnamed pointers), with integer suffixes
/// `0, 1, 2, ...` on collision. Deterministic for a given table list.
#[derive(Debug, Default)]
pub struct Aliases {
    by_id: HashMap<u64, String>,
}

impl Aliases {
    pub fn generate(tables: &[TableVariable]) -> Self {
        Self::default().extend(tables)
    }

    /// A new map holding these assignments plus aliases for `tables`,
    /// avoiding collisions with the existing ones. Used for correlated
    /// subqueries, whose inner tables must not shadow an outer alias.
    pub(crate) fn extend(&self, tables: &[TableVariable]) -> Self {
        let mut by_id = self.by_id.clone();
        let mut used: HashSet<String> = by_id.values().cloned().collect();
        for table in tables {
            if by_id.contains_key(&table.id) {
                continue;
            }
            let stem = table.pointer.default_alias();
            let mut alias = stem.clone();
            let mut suffix = 0u32;
            while used.contains(&alias) {
                alias = format!("{}{}", stem, suffix);
                suffix += 1;
            }
            used.insert(alias.clone());
            by_id.insert(table.id, alias);
        }
        Self { by_id }
    }

    pub(crate) fn contains(&self, table: &TableVariable) -> bool {
        self.by_id.contains_key(&table.id)
    }

    pub fn get(&self, table: &TableVariable) -> Result<&str, QueryError> {
        self.by_id
            .get(&table.id)
            .map(String::as_str)
            .ok_or_else(|| {
                QueryError::Inconsistency(format!(
                    "table '{}' is not part of this query",
                    table.pointer.table_name().unwrap_or("<raw>")
                ))
            })
    }
}
