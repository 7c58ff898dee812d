//! Azure Synapse serverless (T-SQL) dialect.
//!
//! T-SQL differences this crate bridges:
//! - `1`/`0` boolean literals
//! - Leading `TOP n` instead of trailing `LIMIT n`
//! - No trailing ORDER BY: queries are rendered for use inside derived
//!   tables, where T-SQL rejects the clause
//! - `CHARINDEX(term, field) > 0` for substring search
//! - `CASE WHEN EXISTS (...) THEN 1 ELSE 0 END` for EXISTS in select position
//! - Literal row sets via `(VALUES ...) AS alias (columns)`

use super::helpers;
use super::SqlDialect;
use crate::sql::literal::DataType;
use crate::sql::token::{Token, TokenStream};

/// Azure Synapse serverless SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Synapse;

impl SqlDialect for Synapse {
    fn name(&self) -> &'static str {
        "synapse"
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn uses_top_for_limit(&self) -> bool {
        true
    }

    fn supports_trailing_order_by(&self) -> bool {
        false
    }

    fn emit_text_contains(&self, field: &TokenStream, term: &Token) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::FunctionName("CHARINDEX".into()))
            .lparen()
            .push(term.clone())
            .comma()
            .space()
            .append(field)
            .rparen()
            .space()
            .push(Token::Gt)
            .space()
            .push(Token::LitInt(0));
        ts
    }

    /// T-SQL only allows EXISTS inside a predicate, so select-position
    /// tests become a CASE expression yielding the numeric bool.
    fn emit_exists(&self, subquery: &TokenStream) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Raw("CASE WHEN EXISTS".into()))
            .space()
            .lparen()
            .append(subquery)
            .rparen()
            .space()
            .push(Token::Raw("THEN 1 ELSE 0 END".into()));
        ts
    }

    fn emit_data_type(&self, dt: DataType) -> &'static str {
        helpers::emit_data_type_synapse(dt)
    }

    fn emit_values_table(
        &self,
        columns: &[(&str, DataType)],
        rows: &[Vec<Token>],
        alias: &str,
    ) -> TokenStream {
        // (VALUES (1, 'x'), (2, 'y')) AS v (a, b)
        let mut ts = TokenStream::new();
        ts.lparen()
            .push(Token::Values)
            .space()
            .append(&helpers::emit_row_tuples(rows))
            .rparen()
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.into()))
            .space()
            .lparen();
        for (i, (name, _)) in columns.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident((*name).into()));
        }
        ts.rparen();
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_values_table_values_clause() {
        let columns = [("person_id", DataType::Int64), ("status", DataType::String)];
        let rows = vec![
            vec![Token::LitInt(1), Token::LitString("active".into())],
            vec![Token::LitInt(2), Token::LitNull],
        ];
        let ts = Synapse.emit_values_table(&columns, &rows, "v");
        assert_eq!(
            ts.serialize(Dialect::Synapse),
            "(VALUES (1, 'active'), (2, NULL)) AS v (person_id, status)"
        );
    }
}
