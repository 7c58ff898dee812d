//! SQL generation module.
//!
//! A type-safe SQL builder that renders multi-dialect SELECT, INSERT, and
//! UPDATE statements:
//!
//! - [`table`] / [`field`] - pointers and per-query variables
//! - [`filter`] - WHERE/HAVING predicates as a closed sum
//! - [`query`] - SELECT query assembly
//! - [`dml`] - INSERT and UPDATE builders
//! - [`literal`] - typed literals
//! - [`token`] - token types for SQL generation
//! - [`dialect`] - SQL dialect implementations
//! - [`context`] - dialect plus table-name resolution strategy

pub mod context;
pub mod dialect;
pub mod dml;
pub mod field;
pub mod filter;
pub mod literal;
pub mod query;
pub mod table;
pub mod token;

// Re-export commonly used types at the sql module level
pub use context::{BigQueryNames, RenderContext, SynapseNames, TableNameResolver};
pub use dialect::{Dialect, SqlDialect};
pub use dml::{InsertFromSelect, InsertFromValues, UpdateFromSelect, UpdateFromValues};
pub use field::{FieldPointer, FieldVariable, ForeignKey};
pub use filter::{BinaryOperator, Filter, FilterVariable, FunctionTemplate, LogicalOperator};
pub use literal::{DataType, Literal};
pub use query::{ExistsExpression, OrderByDirection, OrderByVariable, Query, SelectExpression};
pub use table::{Aliases, TablePointer, TableVariable};
pub use token::{Token, TokenStream};
