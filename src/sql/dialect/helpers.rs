//! Shared helper functions for SQL dialect implementations.
//!
//! Reusable building blocks that dialects compose to implement the
//! `SqlDialect` trait with minimal duplication.

use super::super::literal::DataType;
use super::super::token::{Token, TokenStream};

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
/// Used by: all dialects
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: BigQuery
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: Synapse (T-SQL)
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit `LIMIT n` (standard SQL).
/// Used by: BigQuery
pub fn emit_limit_standard(limit: u64) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Limit).space().push(Token::LitUint(limit));
    ts
}

// =============================================================================
// Data Type Emission
// =============================================================================

/// Emit data type for BigQuery.
pub fn emit_data_type_bigquery(dt: DataType) -> &'static str {
    match dt {
        DataType::Int64 => "INT64",
        DataType::String => "STRING",
        DataType::Boolean => "BOOL",
        DataType::Date => "DATE",
        DataType::Double => "FLOAT64",
    }
}

/// Emit data type for Synapse (T-SQL).
pub fn emit_data_type_synapse(dt: DataType) -> &'static str {
    match dt {
        DataType::Int64 => "BIGINT",
        DataType::String => "VARCHAR(MAX)",
        DataType::Boolean => "BIT",
        DataType::Date => "DATE",
        DataType::Double => "FLOAT",
    }
}

// =============================================================================
// Literal Row Tuples
// =============================================================================

/// Emit `(v1, v2), (v1, v2), ...` row tuples shared by both values-table
/// renderings.
pub fn emit_row_tuples(rows: &[Vec<Token>]) -> TokenStream {
    let mut ts = TokenStream::new();
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.lparen();
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                ts.comma().space();
            }
            ts.push(value.clone());
        }
        ts.rparen();
    }
    ts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_quote_string_single() {
        assert_eq!(quote_string_single("abc"), "'abc'");
        assert_eq!(quote_string_single("a'b"), "'a''b'");
    }

    #[test]
    fn test_row_tuples() {
        let rows = vec![
            vec![Token::LitInt(1), Token::LitString("a".into())],
            vec![Token::LitInt(2), Token::LitNull],
        ];
        let ts = emit_row_tuples(&rows);
        assert_eq!(ts.serialize(Dialect::BigQuery), "(1, 'a'), (2, NULL)");
    }
}
