//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for the dialect differences
//! this crate has to bridge:
//!
//! - Boolean literals: true/false vs 1/0
//! - Row limiting: trailing `LIMIT n` vs leading `TOP n`
//! - Whether the outer query may carry a trailing ORDER BY
//! - Substring search: `CONTAINS_SUBSTR` vs `CHARINDEX(...) > 0`
//! - EXISTS in select position: bare vs `CASE WHEN ... THEN 1 ELSE 0 END`
//! - Typed literal row sets: `UNNEST([STRUCT<...>])` vs `(VALUES ...)`
//!
//! Adding a dialect means implementing [`SqlDialect`] and adding a variant to
//! [`Dialect`]; exhaustive matching surfaces every divergence point.

mod bigquery;
pub mod helpers;
mod synapse;

pub use bigquery::BigQuery;
pub use synapse::Synapse;

use super::literal::DataType;
use super::token::{Token, TokenStream};

/// SQL dialect trait - defines how dialect-divergent constructs are rendered.
///
/// The default implementations follow GoogleSQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote a string literal.
    ///
    /// Both dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    ///
    /// - BigQuery: `true`/`false`
    /// - Synapse (T-SQL): `1`/`0`
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a date literal from a `YYYY-MM-DD` string.
    fn format_date_literal(&self, date: &str) -> String {
        format!("DATE('{}')", date)
    }

    /// Whether row limits render as a leading `TOP n` instead of a trailing
    /// `LIMIT n`.
    fn uses_top_for_limit(&self) -> bool {
        false
    }

    /// Whether the outer query may carry a trailing ORDER BY.
    ///
    /// Synapse queries are rendered for use inside derived tables, where
    /// T-SQL rejects ORDER BY, so the clause is dropped there.
    fn supports_trailing_order_by(&self) -> bool {
        true
    }

    /// Emit a trailing row-limit clause.
    fn emit_limit(&self, limit: u64) -> TokenStream {
        helpers::emit_limit_standard(limit)
    }

    /// Emit a substring-match predicate over an already-rendered field.
    ///
    /// - BigQuery: `CONTAINS_SUBSTR(field, term)`
    /// - Synapse: `CHARINDEX(term, field) > 0`
    fn emit_text_contains(&self, field: &TokenStream, term: &Token) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("CONTAINS_SUBSTR".into()))
            .lparen()
            .append(field)
            .comma()
            .space()
            .push(term.clone())
            .rparen();
        ts
    }

    /// Emit an EXISTS test over an already-rendered subquery, usable in
    /// select position.
    ///
    /// - BigQuery: `EXISTS (subquery)`
    /// - Synapse: `CASE WHEN EXISTS (subquery) THEN 1 ELSE 0 END` (T-SQL
    ///   only allows EXISTS inside a predicate)
    fn emit_exists(&self, subquery: &TokenStream) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Exists)
            .space()
            .lparen()
            .append(subquery)
            .rparen();
        ts
    }

    /// Emit a column data type for this dialect.
    fn emit_data_type(&self, dt: DataType) -> &'static str;

    /// Emit an aliased derived table holding a literal row set.
    ///
    /// - BigQuery: `(SELECT * FROM UNNEST([STRUCT<a INT64, b STRING> (1, 'x'), (2, 'y')])) AS v`
    /// - Synapse: `(VALUES (1, 'x'), (2, 'y')) AS v (a, b)`
    ///
    /// `rows` holds one literal token per column, in column order.
    fn emit_values_table(
        &self,
        columns: &[(&str, DataType)],
        rows: &[Vec<Token>],
        alias: &str,
    ) -> TokenStream;
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    BigQuery,
    Synapse,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::BigQuery => &BigQuery,
            Dialect::Synapse => &Synapse,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.dialect().format_date_literal(date)
    }

    fn uses_top_for_limit(&self) -> bool {
        self.dialect().uses_top_for_limit()
    }

    fn supports_trailing_order_by(&self) -> bool {
        self.dialect().supports_trailing_order_by()
    }

    fn emit_limit(&self, limit: u64) -> TokenStream {
        self.dialect().emit_limit(limit)
    }

    fn emit_text_contains(&self, field: &TokenStream, term: &Token) -> TokenStream {
        self.dialect().emit_text_contains(field, term)
    }

    fn emit_exists(&self, subquery: &TokenStream) -> TokenStream {
        self.dialect().emit_exists(subquery)
    }

    fn emit_data_type(&self, dt: DataType) -> &'static str {
        self.dialect().emit_data_type(dt)
    }

    fn emit_values_table(
        &self,
        columns: &[(&str, DataType)],
        rows: &[Vec<Token>],
        alias: &str,
    ) -> TokenStream {
        self.dialect().emit_values_table(columns, rows, alias)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
