//! cohortql - typed SQL construction and cohort compilation for OMOP-shaped
//! clinical repositories.
//!
//! The crate has three layers:
//!
//! - [`sql`]: a dialect-independent query AST (tables, fields, filters,
//!   SELECT/INSERT/UPDATE builders) rendered through a [`sql::RenderContext`]
//!   for BigQuery or Azure Synapse serverless.
//! - [`criteria`]: the externally-supplied cohort model (range, list, and
//!   domain criteria) and its compiler into filters over the `person` table.
//! - [`concepts`]: prebuilt concept-browsing queries (children, search,
//!   domain lookup) with person roll-up counts.
//!
//! Execution is out of scope; [`results`] defines the typed result contract
//! an executor fills in.
//!
//! # Example
//!
//! ```
//! use cohortql::criteria::{Cohort, Criteria, CriteriaGroup, CriteriaQueryBuilder, RangeCriteria};
//! use cohortql::sql::{Dialect, RenderContext};
//!
//! let builder = CriteriaQueryBuilder::new();
//! let cohort = Cohort {
//!     criteria_groups: vec![CriteriaGroup {
//!         meet_all: true,
//!         must_meet: true,
//!         criteria: vec![Criteria::Range(RangeCriteria {
//!             name: "year_of_birth".into(),
//!             low: 1940,
//!             high: 1960,
//!         })],
//!     }],
//! };
//! let query = builder.rollup_counts_query(&[cohort]).unwrap();
//! let sql = query.render_sql(&RenderContext::new(Dialect::BigQuery)).unwrap();
//! assert!(sql.starts_with("SELECT COUNT(DISTINCT p.person_id) AS count FROM person AS p"));
//! ```

pub mod concepts;
pub mod criteria;
pub mod error;
pub mod results;
pub mod sql;

pub use error::{QueryError, QueryResult};
