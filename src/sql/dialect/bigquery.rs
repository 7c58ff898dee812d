//! BigQuery (GoogleSQL) dialect.
//!
//! BigQuery characteristics this crate cares about:
//! - `true`/`false` boolean literals
//! - Trailing `ORDER BY` / `LIMIT`
//! - `CONTAINS_SUBSTR` for substring search
//! - Literal row sets via `UNNEST([STRUCT<...> ...])`

use super::helpers;
use super::SqlDialect;
use crate::sql::literal::DataType;
use crate::sql::token::{Token, TokenStream};

/// BigQuery SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct BigQuery;

impl SqlDialect for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn emit_data_type(&self, dt: DataType) -> &'static str {
        helpers::emit_data_type_bigquery(dt)
    }

    fn emit_values_table(
        &self,
        columns: &[(&str, DataType)],
        rows: &[Vec<Token>],
        alias: &str,
    ) -> TokenStream {
        // (SELECT * FROM UNNEST([STRUCT<a INT64, b STRING> (1, 'x'), (2, 'y')])) AS v
        let fields = columns
            .iter()
            .map(|(name, dt)| format!("{} {}", name, self.emit_data_type(*dt)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut ts = TokenStream::new();
        ts.lparen()
            .push(Token::Select)
            .space()
            .push(Token::Star)
            .space()
            .push(Token::From)
            .space()
            .push(Token::Raw(format!("UNNEST([STRUCT<{}> ", fields)))
            .append(&helpers::emit_row_tuples(rows))
            .push(Token::Raw("])".into()))
            .rparen()
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.into()));
        ts
    }
}
