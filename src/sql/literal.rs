//! Typed SQL literals.

use std::fmt;

use super::dialect::Dialect;
use super::token::Token;

/// Scalar column types this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int64,
    String,
    Boolean,
    Date,
    Double,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int64 => "INT64",
            DataType::String => "STRING",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Double => "DOUBLE",
        };
        write!(f, "{}", name)
    }
}

/// A typed literal value.
///
/// NULL is its own variant rather than a sentinel payload, so matching on a
/// literal always says what it is.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int64(i64),
    String(String),
    Boolean(bool),
    /// Date held as `YYYY-MM-DD`.
    Date(String),
    Double(f64),
    Null,
}

impl Literal {
    pub fn int64(v: i64) -> Self {
        Literal::Int64(v)
    }

    pub fn string(v: impl Into<String>) -> Self {
        Literal::String(v.into())
    }

    pub fn boolean(v: bool) -> Self {
        Literal::Boolean(v)
    }

    /// Date literal from a `YYYY-MM-DD` string.
    pub fn date(v: impl Into<String>) -> Self {
        Literal::Date(v.into())
    }

    pub fn double(v: f64) -> Self {
        Literal::Double(v)
    }

    /// The data type this literal carries, or `None` for NULL.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Literal::Int64(_) => Some(DataType::Int64),
            Literal::String(_) => Some(DataType::String),
            Literal::Boolean(_) => Some(DataType::Boolean),
            Literal::Date(_) => Some(DataType::Date),
            Literal::Double(_) => Some(DataType::Double),
            Literal::Null => None,
        }
    }

    /// Lower to the dialect-agnostic token representation.
    pub fn to_token(&self) -> Token {
        match self {
            Literal::Int64(v) => Token::LitInt(*v),
            Literal::String(v) => Token::LitString(v.clone()),
            Literal::Boolean(v) => Token::LitBool(*v),
            Literal::Date(v) => Token::LitDate(v.clone()),
            Literal::Double(v) => Token::LitFloat(*v),
            Literal::Null => Token::LitNull,
        }
    }

    /// Render this literal alone for the given dialect.
    pub fn render_sql(&self, dialect: Dialect) -> String {
        self.to_token().serialize(dialect)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int64(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.into())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Boolean(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Double(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_int() {
        assert_eq!(Literal::int64(42).render_sql(Dialect::BigQuery), "42");
        assert_eq!(Literal::int64(-7).render_sql(Dialect::Synapse), "-7");
    }

    #[test]
    fn test_render_string_escapes_quotes() {
        assert_eq!(
            Literal::string("O'Brien").render_sql(Dialect::BigQuery),
            "'O''Brien'"
        );
    }

    #[test]
    fn test_render_bool_per_dialect() {
        assert_eq!(Literal::boolean(true).render_sql(Dialect::BigQuery), "true");
        assert_eq!(Literal::boolean(true).render_sql(Dialect::Synapse), "1");
    }

    #[test]
    fn test_render_date() {
        assert_eq!(
            Literal::date("2001-12-23").render_sql(Dialect::BigQuery),
            "DATE('2001-12-23')"
        );
    }

    #[test]
    fn test_render_null() {
        assert_eq!(Literal::Null.render_sql(Dialect::BigQuery), "NULL");
        assert_eq!(Literal::Null.data_type(), None);
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Literal::from(5), Literal::Int64(5));
        assert_eq!(Literal::from("x"), Literal::String("x".into()));
        assert_eq!(Literal::from(true), Literal::Boolean(true));
    }
}
