//! Fields: column pointers (with optional foreign-key indirection) and
//! per-query field variables.

use crate::error::QueryError;

use super::table::{collect_table, Aliases, TablePointer, TableVariable};
use super::token::{Token, TokenStream};

/// A foreign-key hop from one table's column to a column of another table.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// The table the key points into.
    pub table: TablePointer,
    /// Column of the foreign table the key matches.
    pub key_column: String,
    /// Column of the foreign table the field actually reads.
    pub foreign_column: String,
    /// Join with LEFT JOIN so rows without a match survive.
    pub join_may_be_empty: bool,
}

/// A column description: which table, which column, optionally reached
/// through a foreign key and optionally wrapped in a SQL function.
///
/// A pointer with a foreign key cannot be rendered directly; it must first be
/// resolved with [`FieldPointer::build_variable`], which materializes the
/// join.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPointer {
    table: TablePointer,
    column: String,
    foreign: Option<ForeignKey>,
    function_wrapper: Option<String>,
}

impl FieldPointer {
    /// Column name standing for "all columns".
    pub const ALL_FIELDS: &'static str = "*";

    pub fn new(table: TablePointer, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
            foreign: None,
            function_wrapper: None,
        }
    }

    /// Pointer to all columns of `table`.
    pub fn all_fields(table: TablePointer) -> Self {
        Self::new(table, Self::ALL_FIELDS)
    }

    pub fn with_foreign_key(mut self, foreign: ForeignKey) -> Self {
        self.foreign = Some(foreign);
        self
    }

    pub fn with_function_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.function_wrapper = Some(wrapper.into());
        self
    }

    /// Build a pointer from externally-supplied configuration, where the
    /// three foreign-key parts arrive as independent optional strings. They
    /// must be all present or all absent.
    pub fn from_parts(
        table: TablePointer,
        column: impl Into<String>,
        foreign_table: Option<String>,
        foreign_key_column: Option<String>,
        foreign_column: Option<String>,
    ) -> Result<Self, QueryError> {
        let column = column.into();
        match (foreign_table, foreign_key_column, foreign_column) {
            (None, None, None) => Ok(Self::new(table, column)),
            (Some(ft), Some(key_column), Some(fc)) => {
                Ok(Self::new(table, column).with_foreign_key(ForeignKey {
                    table: TablePointer::named(ft),
                    key_column,
                    foreign_column: fc,
                    join_may_be_empty: false,
                }))
            }
            _ => Err(QueryError::InvalidConfig(format!(
                "field '{}': foreign table, key column and foreign column must be \
                 specified together or not at all",
                column
            ))),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign.is_some()
    }

    pub(crate) fn function_wrapper(&self) -> Option<&str> {
        self.function_wrapper.as_deref()
    }

    /// Bind this pointer to a query.
    ///
    /// For a direct pointer this is just a [`FieldVariable`] on `primary`.
    /// For a foreign-key pointer, the join is materialized: exactly one
    /// joined [`TableVariable`] is appended to `tables` and the returned
    /// variable reads the foreign column off it. The result is never itself
    /// indirect.
    pub fn build_variable(
        &self,
        primary: &TableVariable,
        tables: &mut Vec<TableVariable>,
        alias: Option<&str>,
    ) -> FieldVariable {
        match &self.foreign {
            None => FieldVariable::new(self.clone(), primary, alias),
            Some(foreign) => {
                let join_field = FieldVariable::new(
                    FieldPointer::new(self.table.clone(), self.column.clone()),
                    primary,
                    None,
                );
                let foreign_table = if foreign.join_may_be_empty {
                    TableVariable::for_left_joined(
                        foreign.table.clone(),
                        foreign.key_column.clone(),
                        join_field,
                    )
                } else {
                    TableVariable::for_joined(
                        foreign.table.clone(),
                        foreign.key_column.clone(),
                        join_field,
                    )
                };
                tables.push(foreign_table.clone());

                let mut pointer =
                    FieldPointer::new(foreign.table.clone(), foreign.foreign_column.clone());
                pointer.function_wrapper = self.function_wrapper.clone();
                FieldVariable::new(pointer, &foreign_table, alias)
            }
        }
    }
}

/// A field bound to one table occurrence of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldVariable {
    pointer: FieldPointer,
    table: TableVariable,
    alias: Option<String>,
    is_distinct: bool,
}

impl FieldVariable {
    pub fn new(pointer: FieldPointer, table: &TableVariable, alias: Option<&str>) -> Self {
        Self {
            pointer,
            table: table.clone(),
            alias: alias.map(str::to_string),
            is_distinct: false,
        }
    }

    /// Mark the wrapped column DISTINCT, e.g. `COUNT(DISTINCT p.person_id)`.
    pub fn with_distinct(mut self) -> Self {
        self.is_distinct = true;
        self
    }

    pub fn pointer(&self) -> &FieldPointer {
        &self.pointer
    }

    pub fn table(&self) -> &TableVariable {
        &self.table
    }

    /// Output column name: the explicit alias if set, the column otherwise.
    pub fn alias_or_column(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.pointer.column())
    }

    pub(crate) fn collect_tables(&self, out: &mut Vec<TableVariable>) {
        collect_table(&self.table, out);
    }

    /// Render the bare expression: `a.col`, `a.*`, `WRAPPER(a.col)`,
    /// `WRAPPER(DISTINCT a.col)`.
    pub(crate) fn to_tokens(&self, aliases: &Aliases) -> Result<TokenStream, QueryError> {
        if self.pointer.is_foreign_key() {
            return Err(QueryError::Inconsistency(format!(
                "field '{}' still carries a foreign key; resolve it with build_variable \
                 before rendering",
                self.pointer.column()
            )));
        }
        let alias = aliases.get(&self.table)?.to_string();

        let mut column_ref = TokenStream::new();
        column_ref.push(Token::Ident(alias)).push(Token::Dot);
        if self.pointer.column() == FieldPointer::ALL_FIELDS {
            column_ref.push(Token::Star);
        } else {
            column_ref.push(Token::Ident(self.pointer.column().to_string()));
        }

        let mut ts = TokenStream::new();
        match self.pointer.function_wrapper() {
            Some(wrapper) => {
                ts.push(Token::FunctionName(wrapper.to_string())).lparen();
                if self.is_distinct {
                    ts.push(Token::Distinct).space();
                }
                ts.append(&column_ref).rparen();
            }
            None => {
                if self.is_distinct {
                    ts.push(Token::Distinct).space();
                }
                ts.append(&column_ref);
            }
        }
        Ok(ts)
    }

    /// Render for select position: the expression plus `AS alias` when an
    /// output alias is set.
    pub(crate) fn to_select_tokens(&self, aliases: &Aliases) -> Result<TokenStream, QueryError> {
        let mut ts = self.to_tokens(aliases)?;
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    fn person() -> TableVariable {
        TableVariable::for_primary(TablePointer::named("person"))
    }

    #[test]
    fn test_plain_field_renders_alias_dot_column() {
        let person = person();
        let field = person.make_field_variable("year_of_birth");
        let aliases = Aliases::generate(std::slice::from_ref(&person));
        let ts = field.to_tokens(&aliases).unwrap();
        assert_eq!(ts.serialize(Dialect::BigQuery), "p.year_of_birth");
    }

    #[test]
    fn test_all_fields_renders_star() {
        let person = person();
        let field = FieldVariable::new(
            FieldPointer::all_fields(TablePointer::named("person")),
            &person,
            None,
        );
        let aliases = Aliases::generate(std::slice::from_ref(&person));
        assert_eq!(
            field.to_tokens(&aliases).unwrap().serialize(Dialect::BigQuery),
            "p.*"
        );
    }

    #[test]
    fn test_wrapped_distinct_field_with_alias() {
        let person = person();
        let field = person.make_wrapped_field("person_id", "COUNT", "count", true);
        let aliases = Aliases::generate(std::slice::from_ref(&person));
        assert_eq!(
            field
                .to_select_tokens(&aliases)
                .unwrap()
                .serialize(Dialect::BigQuery),
            "COUNT(DISTINCT p.person_id) AS count"
        );
        assert_eq!(field.alias_or_column(), "count");
    }

    #[test]
    fn test_foreign_key_build_variable_materializes_join() {
        let occurrence = TableVariable::for_primary(TablePointer::named("condition_occurrence"));
        let pointer = FieldPointer::new(
            TablePointer::named("condition_occurrence"),
            "condition_concept_id",
        )
        .with_foreign_key(ForeignKey {
            table: TablePointer::named("concept"),
            key_column: "concept_id".into(),
            foreign_column: "concept_name".into(),
            join_may_be_empty: false,
        });

        let mut tables = vec![occurrence.clone()];
        let field = pointer.build_variable(&occurrence, &mut tables, Some("condition_name"));

        assert_eq!(tables.len(), 2);
        assert!(!tables[1].is_primary());
        assert!(!field.pointer().is_foreign_key());

        let aliases = Aliases::generate(&tables);
        assert_eq!(
            field
                .to_select_tokens(&aliases)
                .unwrap()
                .serialize(Dialect::BigQuery),
            "c0.concept_name AS condition_name"
        );
    }

    #[test]
    fn test_unresolved_foreign_key_render_is_an_error() {
        let person = person();
        let pointer = FieldPointer::new(TablePointer::named("person"), "gender_concept_id")
            .with_foreign_key(ForeignKey {
                table: TablePointer::named("concept"),
                key_column: "concept_id".into(),
                foreign_column: "concept_name".into(),
                join_may_be_empty: false,
            });
        let field = FieldVariable::new(pointer, &person, None);
        let aliases = Aliases::generate(std::slice::from_ref(&person));
        assert!(matches!(
            field.to_tokens(&aliases),
            Err(QueryError::Inconsistency(_))
        ));
    }

    #[test]
    fn test_from_parts_rejects_partial_foreign_key() {
        let result = FieldPointer::from_parts(
            TablePointer::named("person"),
            "gender_concept_id",
            Some("concept".into()),
            None,
            Some("concept_name".into()),
        );
        assert!(matches!(result, Err(QueryError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_parts_complete_foreign_key() {
        let pointer = FieldPointer::from_parts(
            TablePointer::named("person"),
            "gender_concept_id",
            Some("concept".into()),
            Some("concept_id".into()),
            Some("concept_name".into()),
        )
        .unwrap();
        assert!(pointer.is_foreign_key());
    }
}
