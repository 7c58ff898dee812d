//! End-to-end SELECT rendering through the public API.

use cohortql::sql::{
    BinaryOperator, Dialect, FieldPointer, FilterVariable, Literal, OrderByVariable, Query,
    RenderContext, TablePointer, TableVariable,
};

#[test]
fn foreign_key_field_expands_to_join() {
    let person = TableVariable::for_primary(TablePointer::named("person"));
    let gender_name = FieldPointer::from_parts(
        TablePointer::named("person"),
        "gender_concept_id",
        Some("concept".into()),
        Some("concept_id".into()),
        Some("concept_name".into()),
    )
    .unwrap();

    let mut tables = vec![person.clone()];
    let gender_field = gender_name.build_variable(&person, &mut tables, Some("gender_name"));
    let query = Query::new(
        vec![person.make_field_variable("person_id"), gender_field],
        tables,
    );

    let ctx = RenderContext::new(Dialect::BigQuery);
    assert_eq!(
        query.render_sql(&ctx).unwrap(),
        "SELECT c.concept_name AS gender_name, p.person_id FROM person AS p \
         JOIN concept AS c ON c.concept_id = p.gender_concept_id"
    );
}

#[test]
fn same_table_joined_twice_gets_distinct_aliases() {
    let person = TableVariable::for_primary(TablePointer::named("person"));
    let gender = TableVariable::for_joined(
        TablePointer::named("concept"),
        "concept_id",
        person.make_field_variable("gender_concept_id"),
    );
    let race = TableVariable::for_joined(
        TablePointer::named("concept"),
        "concept_id",
        person.make_field_variable("race_concept_id"),
    );
    let query = Query::new(
        vec![
            gender.make_field_variable("concept_name"),
            person.make_field_variable("person_id"),
        ],
        vec![person, gender, race],
    );

    let ctx = RenderContext::new(Dialect::BigQuery);
    assert_eq!(
        query.render_sql(&ctx).unwrap(),
        "SELECT c.concept_name, p.person_id FROM person AS p \
         JOIN concept AS c ON c.concept_id = p.gender_concept_id \
         JOIN concept AS c0 ON c0.concept_id = p.race_concept_id"
    );
}

#[test]
fn order_by_and_limit_render_per_dialect() {
    let person = TableVariable::for_primary(TablePointer::named("person"));
    let id = person.make_field_variable("person_id");
    let query = Query::new(vec![id.clone()], vec![person])
        .with_order_by(vec![OrderByVariable::descending(id)])
        .with_limit(25);

    let bq = RenderContext::new(Dialect::BigQuery);
    assert_eq!(
        query.render_sql(&bq).unwrap(),
        "SELECT p.person_id FROM person AS p ORDER BY p.person_id DESC LIMIT 25"
    );

    let synapse = RenderContext::new(Dialect::Synapse);
    assert_eq!(
        query.render_sql(&synapse).unwrap(),
        "SELECT TOP 25 p.person_id FROM person AS p"
    );
}

#[test]
fn boolean_literals_render_per_dialect() {
    let person = TableVariable::for_primary(TablePointer::named("person"));
    let query = Query::new(
        vec![person.make_field_variable("person_id")],
        vec![person.clone()],
    )
    .with_where(FilterVariable::binary(
        person.make_field_variable("is_deceased"),
        BinaryOperator::Equals,
        Literal::boolean(true),
    ));

    let bq = RenderContext::new(Dialect::BigQuery);
    assert!(query.render_sql(&bq).unwrap().ends_with("p.is_deceased = true"));

    let synapse = RenderContext::new(Dialect::Synapse);
    assert!(query.render_sql(&synapse).unwrap().ends_with("p.is_deceased = 1"));
}

#[test]
fn date_literals_render_with_date_wrapper() {
    let occurrence = TableVariable::for_primary(TablePointer::named("condition_occurrence"));
    let query = Query::new(
        vec![occurrence.make_field_variable("person_id")],
        vec![occurrence.clone()],
    )
    .with_where(FilterVariable::binary(
        occurrence.make_field_variable("condition_start_date"),
        BinaryOperator::GreaterThanOrEqual,
        Literal::date("2020-01-01"),
    ));

    let ctx = RenderContext::new(Dialect::BigQuery);
    assert!(query
        .render_sql(&ctx)
        .unwrap()
        .ends_with("c.condition_start_date >= DATE('2020-01-01')"));
}

#[test]
fn bigquery_context_qualifies_table_names() {
    let person = TableVariable::for_primary(TablePointer::named("person"));
    let query = Query::new(vec![person.make_field_variable("person_id")], vec![person]);

    let ctx = RenderContext::bigquery("my-project", "omop");
    assert_eq!(
        query.render_sql(&ctx).unwrap(),
        "SELECT p.person_id FROM `my-project.omop.person` AS p"
    );
}

#[test]
fn synapse_context_reads_through_openrowset() {
    let person = TableVariable::for_primary(TablePointer::named("person"));
    let query = Query::new(vec![person.make_field_variable("person_id")], vec![person]);

    let ctx = RenderContext::synapse("ds-snapshot");
    assert_eq!(
        query.render_sql(&ctx).unwrap(),
        "SELECT p.person_id FROM \
         (SELECT * FROM OPENROWSET(BULK 'metadata/parquet/person/*/*.parquet', \
         DATA_SOURCE = 'ds-snapshot', FORMAT = 'parquet') AS inner_person) AS p"
    );
}

#[test]
fn rendering_twice_is_byte_identical() {
    let person = TableVariable::for_primary(TablePointer::named("person"));
    let concept = TableVariable::for_joined(
        TablePointer::named("concept"),
        "concept_id",
        person.make_field_variable("gender_concept_id"),
    );
    let query = Query::new(
        vec![
            person.make_field_variable("person_id"),
            concept.make_field_variable("concept_name"),
        ],
        vec![person, concept],
    );

    let ctx = RenderContext::new(Dialect::BigQuery);
    assert_eq!(query.render_sql(&ctx).unwrap(), query.render_sql(&ctx).unwrap());
}
