//! Concept browsing queries: children, hierarchy, search, and domain lookup.
//!
//! These queries drive concept pickers: they list concepts with a roll-up
//! count of distinct persons whose occurrence rows map to the concept or any
//! of its descendants (via the `concept_ancestor` closure table), plus a
//! `has_children` column telling the UI whether a node can be expanded.

use crate::criteria::domain_occurrence;
use crate::error::QueryError;
use crate::sql::field::FieldVariable;
use crate::sql::filter::{BinaryOperator, FilterVariable};
use crate::sql::literal::Literal;
use crate::sql::query::{ExistsExpression, OrderByVariable, Query, SelectExpression};
use crate::sql::table::{TablePointer, TableVariable};

const CONCEPT_TABLE: &str = "concept";
const CONCEPT_ID: &str = "concept_id";
const CONCEPT_NAME: &str = "concept_name";
const CONCEPT_CODE: &str = "concept_code";
const DOMAIN_ID: &str = "domain_id";
const STANDARD_CONCEPT: &str = "standard_concept";
const ANCESTOR_TABLE: &str = "concept_ancestor";
const ANCESTOR_CONCEPT_ID: &str = "ancestor_concept_id";
const DESCENDANT_CONCEPT_ID: &str = "descendant_concept_id";
const RELATIONSHIP_TABLE: &str = "concept_relationship";
const PERSON_ID: &str = "person_id";
const COUNT_ALIAS: &str = "count";
const HAS_CHILDREN_ALIAS: &str = "has_children";
const PARENT_ID_ALIAS: &str = "parent_id";

const SEARCH_LIMIT: u64 = 100;

/// Subquery selecting the direct children of a concept:
/// `concept_relationship` rows where the parent subsumes the child.
fn direct_children_subquery(parent_concept_id: i64) -> Query {
    let relationship = TableVariable::for_primary(TablePointer::named(RELATIONSHIP_TABLE));
    Query::new(
        vec![relationship.make_field_variable("concept_id_2")],
        vec![relationship.clone()],
    )
    .with_where(FilterVariable::and(vec![
        FilterVariable::equals(
            relationship.make_field_variable("concept_id_1"),
            Literal::int64(parent_concept_id),
        ),
        FilterVariable::equals(
            relationship.make_field_variable("relationship_id"),
            Literal::string("Subsumes"),
        ),
    ]))
}

/// `EXISTS (...) AS has_children`: whether any standard concept other than
/// the given one descends from it. The subquery correlates on the enclosing
/// query's concept_id field.
fn has_children_expression(concept_id: &FieldVariable) -> ExistsExpression {
    let ancestor = TableVariable::for_primary(TablePointer::named(ANCESTOR_TABLE));
    let descendant = TableVariable::for_joined(
        TablePointer::named(CONCEPT_TABLE),
        CONCEPT_ID,
        ancestor.make_field_variable(DESCENDANT_CONCEPT_ID),
    );
    let query = Query::new(
        vec![SelectExpression::literal(Literal::int64(1))],
        vec![ancestor.clone(), descendant.clone()],
    )
    .with_where(FilterVariable::and(vec![
        FilterVariable::compare_fields(
            ancestor.make_field_variable(ANCESTOR_CONCEPT_ID),
            BinaryOperator::Equals,
            concept_id.clone(),
        ),
        FilterVariable::compare_fields(
            ancestor.make_field_variable(DESCENDANT_CONCEPT_ID),
            BinaryOperator::NotEquals,
            concept_id.clone(),
        ),
        FilterVariable::equals(
            descendant.make_field_variable(STANDARD_CONCEPT),
            Literal::string("S"),
        ),
    ]));
    ExistsExpression::new(query, HAS_CHILDREN_ALIAS)
}

/// Direct children of a concept within a domain, with person roll-up counts,
/// ordered by concept name.
///
/// Only standard concepts are returned. Counts roll descendants up through
/// the ancestor closure into the domain's occurrence table.
pub fn concept_children_query(
    domain_name: &str,
    parent_concept_id: i64,
) -> Result<Query, QueryError> {
    let occurrence_info = domain_occurrence(domain_name)?;

    let concept = TableVariable::for_primary(TablePointer::named(CONCEPT_TABLE));
    let concept_id = concept.make_field_variable(CONCEPT_ID);
    let concept_name = concept.make_field_variable(CONCEPT_NAME);
    let ancestor = TableVariable::for_joined(
        TablePointer::named(ANCESTOR_TABLE),
        ANCESTOR_CONCEPT_ID,
        concept_id.clone(),
    );
    let occurrence = TableVariable::for_joined(
        TablePointer::named(occurrence_info.table),
        occurrence_info.concept_id_column,
        ancestor.make_field_variable(DESCENDANT_CONCEPT_ID),
    );
    let count = occurrence.make_wrapped_field(PERSON_ID, "COUNT", COUNT_ALIAS, true);

    Ok(Query::new(
        vec![
            SelectExpression::from(concept_name.clone()),
            SelectExpression::from(concept_id.clone()),
            SelectExpression::from(count),
            SelectExpression::from(has_children_expression(&concept_id)),
        ],
        vec![concept.clone(), ancestor, occurrence],
    )
    .with_where(FilterVariable::and(vec![
        FilterVariable::in_subquery(
            concept_id.clone(),
            direct_children_subquery(parent_concept_id),
        ),
        FilterVariable::equals(
            concept.make_field_variable(STANDARD_CONCEPT),
            Literal::string("S"),
        ),
    ]))
    .with_group_by(vec![concept_name.clone(), concept_id])
    .with_order_by(vec![OrderByVariable::ascending(concept_name)]))
}

/// Subquery selecting every ancestor of a concept, excluding the concept
/// itself.
fn all_parents_subquery(concept_id: i64) -> Query {
    let ancestor = TableVariable::for_primary(TablePointer::named(ANCESTOR_TABLE));
    Query::new(
        vec![ancestor.make_field_variable(ANCESTOR_CONCEPT_ID)],
        vec![ancestor.clone()],
    )
    .with_where(FilterVariable::and(vec![
        FilterVariable::equals(
            ancestor.make_field_variable(DESCENDANT_CONCEPT_ID),
            Literal::int64(concept_id),
        ),
        FilterVariable::binary(
            ancestor.make_field_variable(ANCESTOR_CONCEPT_ID),
            BinaryOperator::NotEquals,
            Literal::int64(concept_id),
        ),
    ]))
}

/// Parents of a concept paired with each parent's children, with person
/// roll-up counts, ordered by concept name.
///
/// Each row is one `Subsumes` edge from a parent of the given concept down
/// to one of that parent's children, so the UI can place the concept among
/// its siblings. `parent_id` names the parent, `concept_id` the child, and
/// `has_children` says whether the child expands further. Only standard
/// concepts appear on either side of the edge.
pub fn concept_hierarchy_query(domain_name: &str, concept_id: i64) -> Result<Query, QueryError> {
    let occurrence_info = domain_occurrence(domain_name)?;

    let relationship = TableVariable::for_primary(TablePointer::named(RELATIONSHIP_TABLE));
    let parent_id = relationship.make_aliased_field("concept_id_1", PARENT_ID_ALIAS);
    let child_id = relationship.make_aliased_field("concept_id_2", CONCEPT_ID);
    let child = TableVariable::for_joined(
        TablePointer::named(CONCEPT_TABLE),
        CONCEPT_ID,
        relationship.make_field_variable("concept_id_2"),
    );
    let parent = TableVariable::for_joined(
        TablePointer::named(CONCEPT_TABLE),
        CONCEPT_ID,
        relationship.make_field_variable("concept_id_1"),
    );
    let ancestor = TableVariable::for_joined(
        TablePointer::named(ANCESTOR_TABLE),
        ANCESTOR_CONCEPT_ID,
        relationship.make_field_variable("concept_id_2"),
    );
    let occurrence = TableVariable::for_left_joined(
        TablePointer::named(occurrence_info.table),
        occurrence_info.concept_id_column,
        ancestor.make_field_variable(DESCENDANT_CONCEPT_ID),
    );
    let concept_name = child.make_field_variable(CONCEPT_NAME);
    let concept_code = child.make_field_variable(CONCEPT_CODE);
    let count = occurrence.make_wrapped_field(PERSON_ID, "COUNT", COUNT_ALIAS, true);

    Ok(Query::new(
        vec![
            SelectExpression::from(concept_name.clone()),
            SelectExpression::from(concept_code.clone()),
            SelectExpression::from(parent_id.clone()),
            SelectExpression::from(child_id.clone()),
            SelectExpression::from(count),
            SelectExpression::from(has_children_expression(
                &child.make_field_variable(CONCEPT_ID),
            )),
        ],
        vec![
            relationship.clone(),
            child.clone(),
            parent.clone(),
            ancestor,
            occurrence,
        ],
    )
    .with_where(FilterVariable::and(vec![
        FilterVariable::in_subquery(
            relationship.make_field_variable("concept_id_1"),
            all_parents_subquery(concept_id),
        ),
        FilterVariable::equals(
            relationship.make_field_variable("relationship_id"),
            Literal::string("Subsumes"),
        ),
        FilterVariable::equals(
            parent.make_field_variable(STANDARD_CONCEPT),
            Literal::string("S"),
        ),
        FilterVariable::equals(
            child.make_field_variable(STANDARD_CONCEPT),
            Literal::string("S"),
        ),
    ]))
    .with_group_by(vec![concept_name.clone(), parent_id, child_id, concept_code])
    .with_order_by(vec![OrderByVariable::ascending(concept_name)]))
}

/// Standard concepts of a domain matching an optional search term, with
/// person roll-up counts, most populous first, capped at 100 rows.
///
/// The text match is dialect-divergent (`CONTAINS_SUBSTR` on BigQuery,
/// `CHARINDEX` on Synapse) and tests both the concept name and code. The
/// occurrence join is a LEFT JOIN so unused concepts still appear with a
/// zero count.
pub fn search_concepts_query(
    domain_name: &str,
    filter_text: Option<&str>,
) -> Result<Query, QueryError> {
    let occurrence_info = domain_occurrence(domain_name)?;

    let concept = TableVariable::for_primary(TablePointer::named(CONCEPT_TABLE));
    let concept_id = concept.make_field_variable(CONCEPT_ID);
    let concept_name = concept.make_field_variable(CONCEPT_NAME);
    let ancestor = TableVariable::for_joined(
        TablePointer::named(ANCESTOR_TABLE),
        ANCESTOR_CONCEPT_ID,
        concept_id.clone(),
    );
    let occurrence = TableVariable::for_left_joined(
        TablePointer::named(occurrence_info.table),
        occurrence_info.concept_id_column,
        ancestor.make_field_variable(DESCENDANT_CONCEPT_ID),
    );
    let count = occurrence.make_wrapped_field(PERSON_ID, "COUNT", COUNT_ALIAS, true);

    let mut conditions = vec![
        FilterVariable::equals(
            concept.make_field_variable(DOMAIN_ID),
            Literal::string(domain_name),
        ),
        FilterVariable::equals(
            concept.make_field_variable(STANDARD_CONCEPT),
            Literal::string("S"),
        ),
    ];
    if let Some(text) = filter_text {
        conditions.push(FilterVariable::or(vec![
            FilterVariable::text_contains(concept_name.clone(), text),
            FilterVariable::text_contains(concept.make_field_variable(CONCEPT_CODE), text),
        ]));
    }

    Ok(Query::new(
        vec![concept_name.clone(), concept_id.clone(), count.clone()],
        vec![concept, ancestor, occurrence],
    )
    .with_where(FilterVariable::and(conditions))
    .with_group_by(vec![concept_name, concept_id])
    .with_order_by(vec![OrderByVariable::descending(count)])
    .with_limit(SEARCH_LIMIT))
}

/// `SELECT domain_id FROM concept WHERE concept_id = N`.
pub fn domain_id_query(concept_id: i64) -> Query {
    let concept = TableVariable::for_primary(TablePointer::named(CONCEPT_TABLE));
    Query::new(
        vec![concept.make_field_variable(DOMAIN_ID)],
        vec![concept.clone()],
    )
    .with_where(FilterVariable::binary(
        concept.make_field_variable(CONCEPT_ID),
        BinaryOperator::Equals,
        Literal::int64(concept_id),
    ))
}
