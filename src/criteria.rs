//! Cohort criteria: the externally-supplied model and its compiler.
//!
//! A cohort is an OR of [`Cohort`]s; each cohort ANDs its
//! [`CriteriaGroup`]s; each group combines its [`Criteria`] with AND or OR
//! and may be negated. [`CriteriaQueryBuilder`] compiles the whole structure
//! into filters over one `person` table occurrence.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::sql::filter::{BinaryOperator, FilterVariable, FunctionTemplate};
use crate::sql::literal::Literal;
use crate::sql::query::Query;
use crate::sql::table::{TablePointer, TableVariable};

/// Age/year style range test on a person column: `low <= column <= high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeCriteria {
    /// Person column the range applies to.
    pub name: String,
    pub low: i64,
    pub high: i64,
}

/// Concept-membership test on a person column: the column's concept must be
/// one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCriteria {
    /// Person column holding the concept id.
    pub name: String,
    pub values: Vec<i64>,
}

/// Occurrence test: the person has at least one row in a domain's occurrence
/// table whose concept matches `concept_id` or descends from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCriteria {
    /// Domain name, e.g. `Condition` or `Drug`.
    pub domain_name: String,
    pub concept_id: i64,
}

/// One criteria, as supplied by callers (typically as JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Criteria {
    Range(RangeCriteria),
    List(ListCriteria),
    Domain(DomainCriteria),
}

/// A group of criteria combined with AND (`meet_all`) or OR, optionally
/// negated (`must_meet = false`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaGroup {
    pub meet_all: bool,
    pub must_meet: bool,
    pub criteria: Vec<Criteria>,
}

/// A cohort: the AND of its criteria groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    pub criteria_groups: Vec<CriteriaGroup>,
}

/// The occurrence table and concept column backing a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainOccurrence {
    pub table: &'static str,
    pub concept_id_column: &'static str,
}

/// Fixed mapping from domain name to its occurrence table.
pub fn domain_occurrence(domain_name: &str) -> Result<DomainOccurrence, QueryError> {
    let occurrence = match domain_name {
        "Condition" => DomainOccurrence {
            table: "condition_occurrence",
            concept_id_column: "condition_concept_id",
        },
        "Measurement" => DomainOccurrence {
            table: "measurement",
            concept_id_column: "measurement_concept_id",
        },
        "Visit" => DomainOccurrence {
            table: "visit_occurrence",
            concept_id_column: "visit_concept_id",
        },
        "Procedure" => DomainOccurrence {
            table: "procedure_occurrence",
            concept_id_column: "procedure_concept_id",
        },
        "Observation" => DomainOccurrence {
            table: "observation",
            concept_id_column: "observation_concept_id",
        },
        "Device" => DomainOccurrence {
            table: "device_exposure",
            concept_id_column: "device_concept_id",
        },
        "Drug" => DomainOccurrence {
            table: "drug_exposure",
            concept_id_column: "drug_concept_id",
        },
        _ => {
            return Err(QueryError::BadRequest(format!(
                "unknown domain '{}'",
                domain_name
            )))
        }
    };
    Ok(occurrence)
}

const PERSON_TABLE: &str = "person";
const PERSON_ID_COLUMN: &str = "person_id";
const ANCESTOR_TABLE: &str = "concept_ancestor";
const ANCESTOR_CONCEPT_ID: &str = "ancestor_concept_id";
const CONCEPT_TABLE: &str = "concept";
const CONCEPT_ID: &str = "concept_id";

/// Compiles criteria structures into filters and queries against one
/// `person` table occurrence.
#[derive(Debug, Clone)]
pub struct CriteriaQueryBuilder {
    person: TableVariable,
}

impl Default for CriteriaQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CriteriaQueryBuilder {
    pub fn new() -> Self {
        Self {
            person: TableVariable::for_primary(TablePointer::named(PERSON_TABLE)),
        }
    }

    /// The person occurrence all compiled filters bind to.
    pub fn person(&self) -> &TableVariable {
        &self.person
    }

    fn range_filter(&self, criteria: &RangeCriteria) -> FilterVariable {
        FilterVariable::and(vec![
            FilterVariable::binary(
                self.person.make_field_variable(criteria.name.clone()),
                BinaryOperator::GreaterThanOrEqual,
                Literal::int64(criteria.low),
            ),
            FilterVariable::binary(
                self.person.make_field_variable(criteria.name.clone()),
                BinaryOperator::LessThanOrEqual,
                Literal::int64(criteria.high),
            ),
        ])
    }

    fn list_filter(&self, criteria: &ListCriteria) -> FilterVariable {
        if criteria.values.is_empty() {
            return FilterVariable::always_true();
        }
        // Join the concept table against the person column, then test the
        // joined concept id against the list.
        let concept = TableVariable::for_joined(
            TablePointer::named(CONCEPT_TABLE),
            CONCEPT_ID,
            self.person.make_field_variable(criteria.name.clone()),
        );
        FilterVariable::function(
            FunctionTemplate::In,
            concept.make_field_variable(CONCEPT_ID),
            criteria.values.iter().map(|v| Literal::int64(*v)).collect(),
        )
    }

    fn domain_filter(&self, criteria: &DomainCriteria) -> Result<FilterVariable, QueryError> {
        let occurrence_info = domain_occurrence(&criteria.domain_name)?;
        let occurrence =
            TableVariable::for_primary(TablePointer::named(occurrence_info.table));
        let ancestor = TableVariable::for_joined(
            TablePointer::named(ANCESTOR_TABLE),
            ANCESTOR_CONCEPT_ID,
            occurrence.make_field_variable(occurrence_info.concept_id_column),
        );
        // Match the concept itself or anything that rolls up to it through
        // the ancestor closure.
        let concept_id = Literal::int64(criteria.concept_id);
        let subquery = Query::new(
            vec![occurrence.make_field_variable(PERSON_ID_COLUMN)],
            vec![occurrence.clone(), ancestor.clone()],
        )
        .with_where(FilterVariable::or(vec![
            FilterVariable::equals(
                occurrence.make_field_variable(occurrence_info.concept_id_column),
                concept_id.clone(),
            ),
            FilterVariable::equals(
                ancestor.make_field_variable(ANCESTOR_CONCEPT_ID),
                concept_id,
            ),
        ]));
        Ok(FilterVariable::in_subquery(
            self.person.make_field_variable(PERSON_ID_COLUMN),
            subquery,
        ))
    }

    /// Compile one criteria.
    pub fn generate_filter_for_criteria(
        &self,
        criteria: &Criteria,
    ) -> Result<FilterVariable, QueryError> {
        match criteria {
            Criteria::Range(range) => Ok(self.range_filter(range)),
            Criteria::List(list) => Ok(self.list_filter(list)),
            Criteria::Domain(domain) => self.domain_filter(domain),
        }
    }

    /// Compile a group: AND/OR of its criteria, negated when the group must
    /// not be met.
    pub fn generate_filter_for_criteria_group(
        &self,
        group: &CriteriaGroup,
    ) -> Result<FilterVariable, QueryError> {
        let operands = group
            .criteria
            .iter()
            .map(|c| self.generate_filter_for_criteria(c))
            .collect::<Result<Vec<_>, _>>()?;
        let combined = if group.meet_all {
            FilterVariable::and(operands)
        } else {
            FilterVariable::or(operands)
        };
        Ok(if group.must_meet {
            combined
        } else {
            FilterVariable::not(combined)
        })
    }

    /// Compile a list of groups: all must hold.
    pub fn generate_filter_for_criteria_groups(
        &self,
        groups: &[CriteriaGroup],
    ) -> Result<FilterVariable, QueryError> {
        let operands = groups
            .iter()
            .map(|g| self.generate_filter_for_criteria_group(g))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterVariable::and(operands))
    }

    /// Compile a list of cohorts: a person qualifies by matching any cohort.
    pub fn generate_filter_for_cohorts(
        &self,
        cohorts: &[Cohort],
    ) -> Result<FilterVariable, QueryError> {
        let operands = cohorts
            .iter()
            .map(|c| self.generate_filter_for_criteria_groups(&c.criteria_groups))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterVariable::or(operands))
    }

    /// `SELECT COUNT(DISTINCT person_id) AS count FROM person WHERE ...` for
    /// the matching population.
    pub fn rollup_counts_query(&self, cohorts: &[Cohort]) -> Result<Query, QueryError> {
        debug!("compiling rollup count for {} cohort(s)", cohorts.len());
        let count =
            self.person
                .make_wrapped_field(PERSON_ID_COLUMN, "COUNT", "count", true);
        let filter = self.generate_filter_for_cohorts(cohorts)?;
        Ok(Query::new(vec![count], vec![self.person.clone()]).with_where(filter))
    }

    /// `SELECT person_id FROM person WHERE ...` for the matching population.
    pub fn row_id_query(&self, cohorts: &[Cohort]) -> Result<Query, QueryError> {
        debug!("compiling row ids for {} cohort(s)", cohorts.len());
        let filter = self.generate_filter_for_cohorts(cohorts)?;
        Ok(Query::new(
            vec![self.person.make_field_variable(PERSON_ID_COLUMN)],
            vec![self.person.clone()],
        )
        .with_where(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::context::RenderContext;
    use crate::sql::dialect::Dialect;
    use crate::sql::table::Aliases;

    fn render(builder: &CriteriaQueryBuilder, filter: &FilterVariable) -> String {
        let ctx = RenderContext::new(Dialect::BigQuery);
        let aliases = Aliases::generate(std::slice::from_ref(builder.person()));
        filter
            .to_tokens(&ctx, &aliases)
            .unwrap()
            .serialize(Dialect::BigQuery)
    }

    #[test]
    fn test_range_criteria() {
        let builder = CriteriaQueryBuilder::new();
        let filter = builder
            .generate_filter_for_criteria(&Criteria::Range(RangeCriteria {
                name: "year_of_birth".into(),
                low: 1940,
                high: 1960,
            }))
            .unwrap();
        assert_eq!(
            render(&builder, &filter),
            "(p.year_of_birth >= 1940 AND p.year_of_birth <= 1960)"
        );
    }

    #[test]
    fn test_empty_list_criteria_is_always_true() {
        let builder = CriteriaQueryBuilder::new();
        let filter = builder
            .generate_filter_for_criteria(&Criteria::List(ListCriteria {
                name: "visit_concept_id".into(),
                values: vec![],
            }))
            .unwrap();
        assert_eq!(render(&builder, &filter), "1 = 1");
    }

    #[test]
    fn test_unknown_domain_is_bad_request() {
        let builder = CriteriaQueryBuilder::new();
        let result = builder.generate_filter_for_criteria(&Criteria::Domain(DomainCriteria {
            domain_name: "Galaxy".into(),
            concept_id: 1,
        }));
        assert!(matches!(result, Err(QueryError::BadRequest(_))));
    }

    #[test]
    fn test_domain_occurrence_mapping() {
        let condition = domain_occurrence("Condition").unwrap();
        assert_eq!(condition.table, "condition_occurrence");
        assert_eq!(condition.concept_id_column, "condition_concept_id");

        let drug = domain_occurrence("Drug").unwrap();
        assert_eq!(drug.table, "drug_exposure");
        assert_eq!(drug.concept_id_column, "drug_concept_id");

        let measurement = domain_occurrence("Measurement").unwrap();
        assert_eq!(measurement.table, "measurement");
    }

    #[test]
    fn test_group_negation() {
        let builder = CriteriaQueryBuilder::new();
        let group = CriteriaGroup {
            meet_all: true,
            must_meet: false,
            criteria: vec![Criteria::Range(RangeCriteria {
                name: "year_of_birth".into(),
                low: 1940,
                high: 1960,
            })],
        };
        let filter = builder.generate_filter_for_criteria_group(&group).unwrap();
        assert_eq!(
            render(&builder, &filter),
            "(NOT ((p.year_of_birth >= 1940 AND p.year_of_birth <= 1960)))"
        );
    }

    #[test]
    fn test_criteria_json_round_trip() {
        let json = r#"{
            "criteriaGroups": [{
                "meetAll": true,
                "mustMeet": true,
                "criteria": [
                    {"kind": "range", "name": "year_of_birth", "low": 1940, "high": 1960},
                    {"kind": "list", "name": "visit_concept_id", "values": [9202]},
                    {"kind": "domain", "domainName": "Condition", "conceptId": 316139}
                ]
            }]
        }"#;
        let cohort: Cohort = serde_json::from_str(json).unwrap();
        assert_eq!(cohort.criteria_groups.len(), 1);
        assert_eq!(cohort.criteria_groups[0].criteria.len(), 3);
        assert_eq!(
            cohort.criteria_groups[0].criteria[2],
            Criteria::Domain(DomainCriteria {
                domain_name: "Condition".into(),
                concept_id: 316139,
            })
        );

        let round_tripped: Cohort =
            serde_json::from_str(&serde_json::to_string(&cohort).unwrap()).unwrap();
        assert_eq!(round_tripped, cohort);
    }
}
