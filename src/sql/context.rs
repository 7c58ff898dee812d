//! Render context: dialect plus table-name resolution strategy.
//!
//! The query AST holds logical table names (`person`, `concept`). How a
//! logical name becomes a physical FROM target depends on where the data
//! lives: a BigQuery dataset, Synapse parquet files behind OPENROWSET, or
//! plain names for tests. That strategy is a trait so rendering never has to
//! know which backend it is serving.

use super::dialect::Dialect;

/// Maps a logical table name to the SQL fragment used in FROM position.
pub trait TableNameResolver: Send + Sync {
    fn resolve(&self, table_name: &str) -> String;
}

impl<F> TableNameResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve(&self, table_name: &str) -> String {
        self(table_name)
    }
}

/// Pass-through resolver: logical name is the physical name.
#[derive(Debug, Clone, Copy)]
struct PassThrough;

impl TableNameResolver for PassThrough {
    fn resolve(&self, table_name: &str) -> String {
        table_name.to_string()
    }
}

/// Resolver for BigQuery datasets: `` `project.dataset.table` ``.
#[derive(Debug, Clone)]
pub struct BigQueryNames {
    project: String,
    dataset: String,
}

impl BigQueryNames {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }
}

impl TableNameResolver for BigQueryNames {
    fn resolve(&self, table_name: &str) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, table_name)
    }
}

/// Resolver for Synapse serverless: each table is a parquet directory read
/// through OPENROWSET and wrapped as a derived table.
#[derive(Debug, Clone)]
pub struct SynapseNames {
    data_source: String,
}

impl SynapseNames {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
        }
    }
}

impl TableNameResolver for SynapseNames {
    fn resolve(&self, table_name: &str) -> String {
        format!(
            "(SELECT * FROM OPENROWSET(BULK 'metadata/parquet/{table}/*/*.parquet', \
             DATA_SOURCE = '{ds}', FORMAT = 'parquet') AS inner_{table})",
            table = table_name,
            ds = self.data_source
        )
    }
}

/// Everything rendering needs besides the AST itself.
pub struct RenderContext {
    dialect: Dialect,
    resolver: Box<dyn TableNameResolver>,
}

impl RenderContext {
    /// Context with pass-through table names. The usual choice for tests and
    /// for backends where the connection already scopes the schema.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            resolver: Box::new(PassThrough),
        }
    }

    /// BigQuery context with project-and-dataset qualified table names.
    pub fn bigquery(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            dialect: Dialect::BigQuery,
            resolver: Box::new(BigQueryNames::new(project, dataset)),
        }
    }

    /// Synapse context reading parquet through OPENROWSET.
    pub fn synapse(data_source: impl Into<String>) -> Self {
        Self {
            dialect: Dialect::Synapse,
            resolver: Box::new(SynapseNames::new(data_source)),
        }
    }

    /// Context with a caller-supplied resolution strategy.
    pub fn with_resolver(dialect: Dialect, resolver: impl TableNameResolver + 'static) -> Self {
        Self {
            dialect,
            resolver: Box::new(resolver),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn resolve_table(&self, table_name: &str) -> String {
        self.resolver.resolve(table_name)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through() {
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(ctx.resolve_table("person"), "person");
    }

    #[test]
    fn test_bigquery_qualified_names() {
        let ctx = RenderContext::bigquery("my-project", "omop");
        assert_eq!(ctx.dialect(), Dialect::BigQuery);
        assert_eq!(ctx.resolve_table("person"), "`my-project.omop.person`");
    }

    #[test]
    fn test_synapse_openrowset() {
        let ctx = RenderContext::synapse("ds-snapshot");
        assert_eq!(ctx.dialect(), Dialect::Synapse);
        assert_eq!(
            ctx.resolve_table("concept"),
            "(SELECT * FROM OPENROWSET(BULK 'metadata/parquet/concept/*/*.parquet', \
             DATA_SOURCE = 'ds-snapshot', FORMAT = 'parquet') AS inner_concept)"
        );
    }

    #[test]
    fn test_closure_resolver() {
        let ctx = RenderContext::with_resolver(Dialect::BigQuery, |t: &str| format!("staging_{t}"));
        assert_eq!(ctx.resolve_table("person"), "staging_person");
    }
}
