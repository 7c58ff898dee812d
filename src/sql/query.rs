//! SELECT query assembly and rendering.

use log::debug;

use crate::error::QueryError;

use super::context::RenderContext;
use super::dialect::SqlDialect;
use super::field::FieldVariable;
use super::filter::FilterVariable;
use super::literal::Literal;
use super::table::{collect_table, Aliases, TableVariable};
use super::token::{Token, TokenStream};

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderByDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderByDirection {
    fn to_token(self) -> Token {
        match self {
            OrderByDirection::Ascending => Token::Asc,
            OrderByDirection::Descending => Token::Desc,
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByVariable {
    field: FieldVariable,
    direction: OrderByDirection,
}

impl OrderByVariable {
    pub fn new(field: FieldVariable, direction: OrderByDirection) -> Self {
        Self { field, direction }
    }

    pub fn ascending(field: FieldVariable) -> Self {
        Self::new(field, OrderByDirection::Ascending)
    }

    pub fn descending(field: FieldVariable) -> Self {
        Self::new(field, OrderByDirection::Descending)
    }

    fn to_tokens(&self, aliases: &Aliases) -> Result<TokenStream, QueryError> {
        let mut ts = self.field.to_tokens(aliases)?;
        ts.space().push(self.direction.to_token());
        Ok(ts)
    }
}

/// A subquery tested for row existence in select position, e.g.
/// `EXISTS (SELECT 1 FROM ...) AS has_children`.
///
/// The subquery is rendered in the scope of the enclosing query: tables the
/// outer query already binds are referenced through their outer aliases
/// rather than re-joined.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsExpression {
    query: Box<Query>,
    alias: String,
}

impl ExistsExpression {
    pub fn new(query: Query, alias: impl Into<String>) -> Self {
        Self {
            query: Box::new(query),
            alias: alias.into(),
        }
    }
}

/// One output column of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpression {
    /// A plain or function-wrapped column.
    Field(FieldVariable),
    /// A constant, e.g. the `1` of an existence test's `SELECT 1`.
    Literal {
        value: Literal,
        alias: Option<String>,
    },
    /// Dialect-divergent EXISTS test over a correlated subquery.
    Exists(ExistsExpression),
}

impl SelectExpression {
    pub fn literal(value: Literal) -> Self {
        SelectExpression::Literal { value, alias: None }
    }

    /// Output column name: the alias when set, the column name otherwise.
    /// Unaliased literals have no output name.
    pub fn alias_or_column(&self) -> &str {
        match self {
            SelectExpression::Field(field) => field.alias_or_column(),
            SelectExpression::Literal { alias, .. } => alias.as_deref().unwrap_or(""),
            SelectExpression::Exists(exists) => &exists.alias,
        }
    }

    fn collect_tables(&self, out: &mut Vec<TableVariable>) {
        match self {
            SelectExpression::Field(field) => field.collect_tables(out),
            // Literals bind no tables; an EXISTS subquery is its own scope
            // and never adds joins to the enclosing query.
            SelectExpression::Literal { .. } | SelectExpression::Exists(_) => {}
        }
    }

    fn to_select_tokens(
        &self,
        ctx: &RenderContext,
        aliases: &Aliases,
    ) -> Result<TokenStream, QueryError> {
        match self {
            SelectExpression::Field(field) => field.to_select_tokens(aliases),
            SelectExpression::Literal { value, alias } => {
                let mut ts = TokenStream::new();
                ts.push(value.to_token());
                if let Some(alias) = alias {
                    ts.space()
                        .push(Token::As)
                        .space()
                        .push(Token::Ident(alias.clone()));
                }
                Ok(ts)
            }
            SelectExpression::Exists(exists) => {
                let subquery = exists.query.to_tokens_scoped(ctx, Some(aliases))?;
                let mut ts = ctx.dialect().emit_exists(&subquery);
                ts.space()
                    .push(Token::As)
                    .space()
                    .push(Token::Ident(exists.alias.clone()));
                Ok(ts)
            }
        }
    }
}

impl From<FieldVariable> for SelectExpression {
    fn from(field: FieldVariable) -> Self {
        SelectExpression::Field(field)
    }
}

impl From<ExistsExpression> for SelectExpression {
    fn from(exists: ExistsExpression) -> Self {
        SelectExpression::Exists(exists)
    }
}

/// A SELECT query over one primary table plus joined tables.
///
/// Tables referenced by select fields, filters, or join conditions but not
/// listed explicitly are gathered automatically at render time, in
/// first-reference order after the explicit list.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    select: Vec<SelectExpression>,
    tables: Vec<TableVariable>,
    where_clause: Option<FilterVariable>,
    group_by: Vec<FieldVariable>,
    having: Option<FilterVariable>,
    order_by: Vec<OrderByVariable>,
    limit: Option<u64>,
}

impl Query {
    pub fn new<S: Into<SelectExpression>>(select: Vec<S>, tables: Vec<TableVariable>) -> Self {
        Self {
            select: select.into_iter().map(Into::into).collect(),
            tables,
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn with_where(mut self, filter: FilterVariable) -> Self {
        self.where_clause = Some(filter);
        self
    }

    pub fn with_group_by(mut self, fields: Vec<FieldVariable>) -> Self {
        self.group_by = fields;
        self
    }

    pub fn with_having(mut self, filter: FilterVariable) -> Self {
        self.having = Some(filter);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderByVariable>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn select(&self) -> &[SelectExpression] {
        &self.select
    }

    /// All tables this query touches: the explicit list, then tables
    /// discovered through select fields, filters and join conditions, in
    /// first-reference order, deduplicated by occurrence identity.
    fn all_tables(&self) -> Vec<TableVariable> {
        let mut tables = Vec::new();
        for table in &self.tables {
            collect_table(table, &mut tables);
        }
        for expr in &self.select {
            expr.collect_tables(&mut tables);
        }
        if let Some(filter) = &self.where_clause {
            filter.collect_tables(&mut tables);
        }
        for field in &self.group_by {
            field.collect_tables(&mut tables);
        }
        if let Some(filter) = &self.having {
            filter.collect_tables(&mut tables);
        }
        for order in &self.order_by {
            order.field.collect_tables(&mut tables);
        }
        tables
    }

    pub(crate) fn to_tokens(&self, ctx: &RenderContext) -> Result<TokenStream, QueryError> {
        self.to_tokens_scoped(ctx, None)
    }

    /// Render, treating tables in `outer` as bound by an enclosing query:
    /// they are referenced through their outer aliases and excluded from
    /// this query's FROM clause.
    fn to_tokens_scoped(
        &self,
        ctx: &RenderContext,
        outer: Option<&Aliases>,
    ) -> Result<TokenStream, QueryError> {
        if self.select.is_empty() {
            return Err(QueryError::Inconsistency(
                "query must select at least one field".into(),
            ));
        }
        let tables: Vec<TableVariable> = self
            .all_tables()
            .into_iter()
            .filter(|t| !outer.is_some_and(|o| o.contains(t)))
            .collect();
        let primary_count = tables.iter().filter(|t| t.is_primary()).count();
        if primary_count != 1 {
            return Err(QueryError::Inconsistency(format!(
                "query must have exactly one primary table, found {}",
                primary_count
            )));
        }
        let primary = tables
            .iter()
            .find(|t| t.is_primary())
            .ok_or_else(|| QueryError::Inconsistency("no primary table".into()))?;
        let aliases = match outer {
            Some(outer) => outer.extend(&tables),
            None => Aliases::generate(&tables),
        };
        let dialect = ctx.dialect();

        let mut ts = TokenStream::new();
        ts.push(Token::Select).space();
        if dialect.uses_top_for_limit() {
            if let Some(limit) = self.limit {
                ts.push(Token::Top)
                    .space()
                    .push(Token::LitUint(limit))
                    .space();
            }
        }

        // Output columns in name order, so the same query always renders the
        // same SQL and INSERT column lists line up positionally.
        let mut select = self.select.clone();
        select.sort_by(|a, b| a.alias_or_column().cmp(b.alias_or_column()));
        for (i, expr) in select.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&expr.to_select_tokens(ctx, &aliases)?);
        }

        ts.space().push(Token::From).space();
        ts.append(&primary.to_from_tokens(ctx, &aliases)?);
        for table in &tables {
            if table.is_primary() {
                continue;
            }
            ts.space().append(&table.to_join_tokens(ctx, &aliases)?);
        }

        if let Some(filter) = &self.where_clause {
            ts.space().push(Token::Where).space();
            ts.append(&filter.to_tokens(ctx, &aliases)?);
        }

        if !self.group_by.is_empty() {
            ts.space().push(Token::GroupBy).space();
            for (i, field) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                // Group-by position re-renders the expression, never the
                // output alias.
                ts.append(&field.to_tokens(&aliases)?);
            }
        }

        if let Some(filter) = &self.having {
            ts.space().push(Token::Having).space();
            ts.append(&filter.to_tokens(ctx, &aliases)?);
        }

        if dialect.supports_trailing_order_by() && !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&order.to_tokens(&aliases)?);
            }
        }

        if !dialect.uses_top_for_limit() {
            if let Some(limit) = self.limit {
                ts.space().append(&dialect.emit_limit(limit));
            }
        }

        Ok(ts)
    }

    /// Render to SQL for the given context.
    pub fn render_sql(&self, ctx: &RenderContext) -> Result<String, QueryError> {
        let sql = self.to_tokens(ctx)?.serialize(ctx.dialect());
        debug!("rendered {} query: {}", ctx.dialect(), sql);
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;
    use crate::sql::filter::{BinaryOperator, FilterVariable};
    use crate::sql::literal::Literal;
    use crate::sql::table::TablePointer;

    fn person() -> TableVariable {
        TableVariable::for_primary(TablePointer::named("person"))
    }

    #[test]
    fn test_minimal_select() {
        let person = person();
        let query = Query::new(
            vec![person.make_field_variable("person_id")],
            vec![person],
        );
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&ctx).unwrap(),
            "SELECT p.person_id FROM person AS p"
        );
    }

    #[test]
    fn test_select_list_is_sorted_by_output_name() {
        let person = person();
        let query = Query::new(
            vec![
                person.make_field_variable("year_of_birth"),
                person.make_field_variable("person_id"),
            ],
            vec![person],
        );
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&ctx).unwrap(),
            "SELECT p.person_id, p.year_of_birth FROM person AS p"
        );
    }

    #[test]
    fn test_where_group_by_having() {
        let person = person();
        let year = person.make_field_variable("year_of_birth");
        let count = person.make_wrapped_field("person_id", "COUNT", "count", false);
        let query = Query::new(vec![year.clone(), count.clone()], vec![person.clone()])
            .with_where(FilterVariable::binary(
                person.make_field_variable("year_of_birth"),
                BinaryOperator::GreaterThan,
                Literal::int64(1900),
            ))
            .with_group_by(vec![year])
            .with_having(FilterVariable::binary(
                count.clone(),
                BinaryOperator::GreaterThan,
                Literal::int64(10),
            ));
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&ctx).unwrap(),
            "SELECT COUNT(p.person_id) AS count, p.year_of_birth FROM person AS p \
             WHERE p.year_of_birth > 1900 GROUP BY p.year_of_birth \
             HAVING COUNT(p.person_id) > 10"
        );
    }

    #[test]
    fn test_order_by_and_limit_diverge_per_dialect() {
        let person = person();
        let name = person.make_field_variable("person_id");
        let query = Query::new(vec![name.clone()], vec![person])
            .with_order_by(vec![OrderByVariable::ascending(name)])
            .with_limit(100);

        let bq = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&bq).unwrap(),
            "SELECT p.person_id FROM person AS p ORDER BY p.person_id ASC LIMIT 100"
        );

        let synapse = RenderContext::new(Dialect::Synapse);
        assert_eq!(
            query.render_sql(&synapse).unwrap(),
            "SELECT TOP 100 p.person_id FROM person AS p"
        );
    }

    #[test]
    fn test_joined_tables_are_gathered_from_filters() {
        let person = person();
        let concept = TableVariable::for_joined(
            TablePointer::named("concept"),
            "concept_id",
            person.make_field_variable("gender_concept_id"),
        );
        let query = Query::new(
            vec![person.make_field_variable("person_id")],
            vec![person],
        )
        .with_where(FilterVariable::equals(
            concept.make_field_variable("concept_name"),
            Literal::string("MALE"),
        ));
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&ctx).unwrap(),
            "SELECT p.person_id FROM person AS p \
             JOIN concept AS c ON c.concept_id = p.gender_concept_id \
             WHERE c.concept_name = 'MALE'"
        );
    }

    #[test]
    fn test_filter_discovered_join_chain_renders_in_dependency_order() {
        let person = person();
        let visit = TableVariable::for_joined(
            TablePointer::named("visit_occurrence"),
            "person_id",
            person.make_field_variable("person_id"),
        );
        let concept = TableVariable::for_joined(
            TablePointer::named("concept"),
            "concept_id",
            visit.make_field_variable("visit_concept_id"),
        );
        // Only the WHERE clause mentions the chain; the visit join must
        // still render before the concept join that references it.
        let query = Query::new(
            vec![person.make_field_variable("person_id")],
            vec![person],
        )
        .with_where(FilterVariable::equals(
            concept.make_field_variable("concept_name"),
            Literal::string("Outpatient Visit"),
        ));
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&ctx).unwrap(),
            "SELECT p.person_id FROM person AS p \
             JOIN visit_occurrence AS v ON v.person_id = p.person_id \
             JOIN concept AS c ON c.concept_id = v.visit_concept_id \
             WHERE c.concept_name = 'Outpatient Visit'"
        );
    }

    #[test]
    fn test_correlated_exists_in_select_position() {
        let person = person();
        let visit = TableVariable::for_primary(TablePointer::named("visit_occurrence"));
        let inner = Query::new(
            vec![SelectExpression::literal(Literal::int64(1))],
            vec![visit.clone()],
        )
        .with_where(FilterVariable::compare_fields(
            visit.make_field_variable("person_id"),
            BinaryOperator::Equals,
            person.make_field_variable("person_id"),
        ));
        let query = Query::new(
            vec![
                SelectExpression::from(person.make_field_variable("person_id")),
                SelectExpression::from(ExistsExpression::new(inner, "has_visits")),
            ],
            vec![person],
        );
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&ctx).unwrap(),
            "SELECT EXISTS (SELECT 1 FROM visit_occurrence AS v \
             WHERE v.person_id = p.person_id) AS has_visits, p.person_id \
             FROM person AS p"
        );
    }

    #[test]
    fn test_limit_survives_full_u64_range() {
        let person = person();
        let query = Query::new(
            vec![person.make_field_variable("person_id")],
            vec![person],
        )
        .with_limit(u64::MAX);

        let bq = RenderContext::new(Dialect::BigQuery);
        assert!(query
            .render_sql(&bq)
            .unwrap()
            .ends_with("LIMIT 18446744073709551615"));

        let synapse = RenderContext::new(Dialect::Synapse);
        assert!(query
            .render_sql(&synapse)
            .unwrap()
            .starts_with("SELECT TOP 18446744073709551615 "));
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let person = person();
        let query = Query::new(
            vec![person.make_field_variable("person_id")],
            vec![person],
        );
        let ctx = RenderContext::new(Dialect::BigQuery);
        let first = query.render_sql(&ctx).unwrap();
        let second = query.render_sql(&ctx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_select_is_an_error() {
        let person = person();
        let query = Query::new(Vec::<FieldVariable>::new(), vec![person]);
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert!(matches!(
            query.render_sql(&ctx),
            Err(QueryError::Inconsistency(_))
        ));
    }

    #[test]
    fn test_two_primary_tables_is_an_error() {
        let a = person();
        let b = TableVariable::for_primary(TablePointer::named("concept"));
        let query = Query::new(vec![a.make_field_variable("person_id")], vec![a, b]);
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert!(matches!(
            query.render_sql(&ctx),
            Err(QueryError::Inconsistency(_))
        ));
    }

    #[test]
    fn test_filtered_table_pointer_renders_derived_table() {
        use crate::sql::filter::Filter;

        let pointer = TablePointer::filtered(
            "person",
            Filter::binary("year_of_birth", BinaryOperator::GreaterThan, Literal::int64(1980)),
        );
        let filtered = TableVariable::for_primary(pointer);
        let query = Query::new(
            vec![filtered.make_field_variable("person_id")],
            vec![filtered],
        );
        let ctx = RenderContext::new(Dialect::BigQuery);
        assert_eq!(
            query.render_sql(&ctx).unwrap(),
            "SELECT t.person_id FROM \
             (SELECT p.* FROM person AS p WHERE p.year_of_birth > 1980) AS t"
        );
    }
}
