//! Filters: WHERE/HAVING predicates as a closed sum.
//!
//! [`Filter`] describes a predicate against a table by column name, before
//! any query exists; [`FilterVariable`] is the bound form, with every leaf
//! resolved to a [`FieldVariable`] of a concrete query. Every possible
//! predicate shape is a variant here, so dialect rendering can match
//! exhaustively.

use crate::error::QueryError;

use super::context::RenderContext;
use super::dialect::SqlDialect;
use super::field::FieldVariable;
use super::literal::Literal;
use super::query::Query;
use super::table::{Aliases, TableVariable};
use super::token::{Token, TokenStream};

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl BinaryOperator {
    fn to_token(self) -> Token {
        match self {
            BinaryOperator::Equals => Token::Eq,
            BinaryOperator::NotEquals => Token::Ne,
            BinaryOperator::LessThan => Token::Lt,
            BinaryOperator::GreaterThan => Token::Gt,
            BinaryOperator::LessThanOrEqual => Token::Lte,
            BinaryOperator::GreaterThanOrEqual => Token::Gte,
        }
    }
}

/// AND / OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    fn to_token(self) -> Token {
        match self {
            LogicalOperator::And => Token::And,
            LogicalOperator::Or => Token::Or,
        }
    }
}

/// Multi-value predicate shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionTemplate {
    /// `field IN (v1, v2, ...)`
    In,
    /// `field NOT IN (v1, v2, ...)`
    NotIn,
    /// Dialect-divergent substring match on a single term.
    TextContains,
}

/// A predicate described against a table pointer, by column name.
///
/// This is the form external configuration supplies (e.g. a row-level filter
/// embedded in a table definition); [`Filter::build_variable`] binds it to a
/// concrete query.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Binary {
        column: String,
        op: BinaryOperator,
        value: Literal,
    },
    BooleanAndOr {
        op: LogicalOperator,
        operands: Vec<Filter>,
    },
}

impl Filter {
    pub fn binary(column: impl Into<String>, op: BinaryOperator, value: Literal) -> Self {
        Filter::Binary {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn and(operands: Vec<Filter>) -> Self {
        Filter::BooleanAndOr {
            op: LogicalOperator::And,
            operands,
        }
    }

    pub fn or(operands: Vec<Filter>) -> Self {
        Filter::BooleanAndOr {
            op: LogicalOperator::Or,
            operands,
        }
    }

    /// Bind to a query: every column becomes a field of `primary`.
    ///
    /// `tables` is threaded through for parity with
    /// [`crate::sql::FieldPointer::build_variable`]; plain column predicates
    /// never add tables.
    pub fn build_variable(
        &self,
        primary: &TableVariable,
        tables: &mut Vec<TableVariable>,
    ) -> FilterVariable {
        match self {
            Filter::Binary { column, op, value } => FilterVariable::Binary {
                field: primary.make_field_variable(column.clone()),
                op: *op,
                value: value.clone(),
            },
            Filter::BooleanAndOr { op, operands } => FilterVariable::BooleanAndOr {
                op: *op,
                operands: operands
                    .iter()
                    .map(|f| f.build_variable(primary, tables))
                    .collect(),
            },
        }
    }
}

/// A predicate bound to a concrete query.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterVariable {
    /// `field op literal`
    Binary {
        field: FieldVariable,
        op: BinaryOperator,
        value: Literal,
    },
    /// `left op right`, both sides fields. This is how a correlated
    /// subquery ties its rows back to the outer query.
    FieldComparison {
        left: FieldVariable,
        op: BinaryOperator,
        right: FieldVariable,
    },
    /// Parenthesized conjunction or disjunction. An empty operand list
    /// renders as the neutral `1 = 1`.
    BooleanAndOr {
        op: LogicalOperator,
        operands: Vec<FilterVariable>,
    },
    /// `(NOT inner)`
    Not(Box<FilterVariable>),
    /// Multi-value template applied to one field. An empty IN list renders
    /// as the neutral `1 = 1`.
    Function {
        template: FunctionTemplate,
        field: FieldVariable,
        values: Vec<Literal>,
    },
    /// `field IN (subquery)`
    SubQuery {
        field: FieldVariable,
        query: Box<Query>,
    },
}

impl FilterVariable {
    pub fn binary(field: FieldVariable, op: BinaryOperator, value: Literal) -> Self {
        FilterVariable::Binary { field, op, value }
    }

    pub fn equals(field: FieldVariable, value: Literal) -> Self {
        Self::binary(field, BinaryOperator::Equals, value)
    }

    pub fn compare_fields(left: FieldVariable, op: BinaryOperator, right: FieldVariable) -> Self {
        FilterVariable::FieldComparison { left, op, right }
    }

    pub fn and(operands: Vec<FilterVariable>) -> Self {
        FilterVariable::BooleanAndOr {
            op: LogicalOperator::And,
            operands,
        }
    }

    pub fn or(operands: Vec<FilterVariable>) -> Self {
        FilterVariable::BooleanAndOr {
            op: LogicalOperator::Or,
            operands,
        }
    }

    pub fn not(inner: FilterVariable) -> Self {
        FilterVariable::Not(Box::new(inner))
    }

    /// A predicate that matches every row.
    pub fn always_true() -> Self {
        Self::and(vec![])
    }

    pub fn function(template: FunctionTemplate, field: FieldVariable, values: Vec<Literal>) -> Self {
        FilterVariable::Function {
            template,
            field,
            values,
        }
    }

    /// Substring match against a single search term.
    pub fn text_contains(field: FieldVariable, term: impl Into<String>) -> Self {
        FilterVariable::Function {
            template: FunctionTemplate::TextContains,
            field,
            values: vec![Literal::string(term)],
        }
    }

    /// `field IN (query)`.
    pub fn in_subquery(field: FieldVariable, query: Query) -> Self {
        FilterVariable::SubQuery {
            field,
            query: Box::new(query),
        }
    }

    pub(crate) fn collect_tables(&self, out: &mut Vec<TableVariable>) {
        match self {
            FilterVariable::Binary { field, .. } => field.collect_tables(out),
            FilterVariable::FieldComparison { left, right, .. } => {
                left.collect_tables(out);
                right.collect_tables(out);
            }
            FilterVariable::BooleanAndOr { operands, .. } => {
                for operand in operands {
                    operand.collect_tables(out);
                }
            }
            FilterVariable::Not(inner) => inner.collect_tables(out),
            FilterVariable::Function { field, .. } => field.collect_tables(out),
            // A subquery is its own scope; only the outer field binds here.
            FilterVariable::SubQuery { field, .. } => field.collect_tables(out),
        }
    }

    pub(crate) fn to_tokens(
        &self,
        ctx: &RenderContext,
        aliases: &Aliases,
    ) -> Result<TokenStream, QueryError> {
        let mut ts = TokenStream::new();
        match self {
            FilterVariable::Binary { field, op, value } => {
                ts.append(&field.to_tokens(aliases)?)
                    .space()
                    .push(op.to_token())
                    .space()
                    .push(value.to_token());
            }
            FilterVariable::FieldComparison { left, op, right } => {
                ts.append(&left.to_tokens(aliases)?)
                    .space()
                    .push(op.to_token())
                    .space()
                    .append(&right.to_tokens(aliases)?);
            }
            FilterVariable::BooleanAndOr { op, operands } => {
                if operands.is_empty() {
                    return Ok(neutral_predicate());
                }
                ts.lparen();
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        ts.space().push(op.to_token()).space();
                    }
                    ts.append(&operand.to_tokens(ctx, aliases)?);
                }
                ts.rparen();
            }
            FilterVariable::Not(inner) => {
                ts.lparen()
                    .push(Token::Not)
                    .space()
                    .append(&inner.to_tokens(ctx, aliases)?)
                    .rparen();
            }
            FilterVariable::Function {
                template,
                field,
                values,
            } => match template {
                FunctionTemplate::In | FunctionTemplate::NotIn => {
                    if values.is_empty() {
                        return Ok(neutral_predicate());
                    }
                    ts.append(&field.to_tokens(aliases)?).space();
                    if *template == FunctionTemplate::NotIn {
                        ts.push(Token::Not).space();
                    }
                    ts.push(Token::In).space().lparen();
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.push(value.to_token());
                    }
                    ts.rparen();
                }
                FunctionTemplate::TextContains => {
                    let term = values.first().ok_or_else(|| {
                        QueryError::Inconsistency(
                            "text search filter is missing its search term".into(),
                        )
                    })?;
                    let field_tokens = field.to_tokens(aliases)?;
                    ts.append(&ctx.dialect().emit_text_contains(&field_tokens, &term.to_token()));
                }
            },
            FilterVariable::SubQuery { field, query } => {
                ts.append(&field.to_tokens(aliases)?)
                    .space()
                    .push(Token::In)
                    .space()
                    .lparen()
                    .append(&query.to_tokens(ctx)?)
                    .rparen();
            }
        }
        Ok(ts)
    }
}

/// `1 = 1`, the neutral predicate for empty operand lists.
fn neutral_predicate() -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::LitInt(1))
        .space()
        .push(Token::Eq)
        .space()
        .push(Token::LitInt(1));
    ts
}
