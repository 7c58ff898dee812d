//! Typed result model: schemas, rows, and cells.
//!
//! Execution lives outside this crate; these types are the contract an
//! executor fills in and the DML builders read back (e.g. to replay rows as
//! a literal values table).

use std::sync::Arc;

use crate::error::QueryError;
use crate::sql::literal::{DataType, Literal};

/// One output column: name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    name: String,
    data_type: DataType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Column schema for a whole result set, held sorted by column name so cell
/// positions are deterministic and lookup is a binary search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeaderSchema {
    columns: Vec<ColumnSchema>,
}

impl ColumnHeaderSchema {
    pub fn new(mut columns: Vec<ColumnSchema>) -> Self {
        columns.sort_by(|a, b| a.name.cmp(&b.name));
        Self { columns }
    }

    /// Columns in name order.
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Position of a named column.
    pub fn index_of(&self, name: &str) -> Result<usize, QueryError> {
        self.columns
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .map_err(|_| QueryError::ColumnNotFound(name.to_string()))
    }
}

/// One cell: a declared type plus an optional value (`None` is SQL NULL).
#[derive(Debug, Clone, PartialEq)]
pub struct CellValue {
    data_type: DataType,
    value: Option<Literal>,
}

impl CellValue {
    /// A cell holding `value`. The literal must match the declared type;
    /// `Literal::Null` is normalized to an absent value.
    pub fn new(data_type: DataType, value: Option<Literal>) -> Result<Self, QueryError> {
        let value = match value {
            Some(Literal::Null) | None => None,
            Some(literal) => {
                if let Some(actual) = literal.data_type() {
                    if actual != data_type {
                        return Err(QueryError::TypeMismatch {
                            expected: data_type,
                            actual,
                        });
                    }
                }
                Some(literal)
            }
        };
        Ok(Self { data_type, value })
    }

    /// A NULL cell of the given type.
    pub fn null(data_type: DataType) -> Self {
        Self {
            data_type,
            value: None,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn literal(&self) -> Option<&Literal> {
        self.value.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    fn require_type(&self, expected: DataType) -> Result<(), QueryError> {
        if self.data_type != expected {
            return Err(QueryError::TypeMismatch {
                expected,
                actual: self.data_type,
            });
        }
        Ok(())
    }

    /// The INT64 value, `None` for NULL.
    pub fn as_int64(&self) -> Result<Option<i64>, QueryError> {
        self.require_type(DataType::Int64)?;
        match &self.value {
            Some(Literal::Int64(v)) => Ok(Some(*v)),
            _ => Ok(None),
        }
    }

    /// The STRING value, `None` for NULL.
    pub fn as_string(&self) -> Result<Option<&str>, QueryError> {
        self.require_type(DataType::String)?;
        match &self.value {
            Some(Literal::String(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    /// The BOOLEAN value, `None` for NULL.
    pub fn as_boolean(&self) -> Result<Option<bool>, QueryError> {
        self.require_type(DataType::Boolean)?;
        match &self.value {
            Some(Literal::Boolean(v)) => Ok(Some(*v)),
            _ => Ok(None),
        }
    }

    /// The DOUBLE value, `None` for NULL.
    pub fn as_double(&self) -> Result<Option<f64>, QueryError> {
        self.require_type(DataType::Double)?;
        match &self.value {
            Some(Literal::Double(v)) => Ok(Some(*v)),
            _ => Ok(None),
        }
    }
}

/// One result row. Cell order follows the schema's (name-sorted) column
/// order; the schema is shared across rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RowResult {
    schema: Arc<ColumnHeaderSchema>,
    cells: Vec<CellValue>,
}

impl RowResult {
    pub fn new(schema: Arc<ColumnHeaderSchema>, cells: Vec<CellValue>) -> Result<Self, QueryError> {
        if cells.len() != schema.columns().len() {
            return Err(QueryError::Inconsistency(format!(
                "row has {} cells but the schema has {} columns",
                cells.len(),
                schema.columns().len()
            )));
        }
        for (cell, column) in cells.iter().zip(schema.columns()) {
            if cell.data_type() != column.data_type() {
                return Err(QueryError::TypeMismatch {
                    expected: column.data_type(),
                    actual: cell.data_type(),
                });
            }
        }
        Ok(Self { schema, cells })
    }

    pub fn schema(&self) -> &Arc<ColumnHeaderSchema> {
        &self.schema
    }

    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Result<&CellValue, QueryError> {
        let index = self.schema.index_of(name)?;
        self.cells.get(index).ok_or_else(|| {
            QueryError::Inconsistency(format!("row has no cell at index {}", index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<ColumnHeaderSchema> {
        Arc::new(ColumnHeaderSchema::new(vec![
            ColumnSchema::new("person_id", DataType::Int64),
            ColumnSchema::new("concept_name", DataType::String),
        ]))
    }

    #[test]
    fn test_schema_sorts_columns_by_name() {
        let schema = schema();
        let names: Vec<&str> = schema.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["concept_name", "person_id"]);
        assert_eq!(schema.index_of("person_id").unwrap(), 1);
    }

    #[test]
    fn test_unknown_column() {
        assert!(matches!(
            schema().index_of("missing"),
            Err(QueryError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_cell_accessors() {
        let cell = CellValue::new(DataType::Int64, Some(Literal::int64(42))).unwrap();
        assert_eq!(cell.as_int64().unwrap(), Some(42));
        assert!(matches!(
            cell.as_string(),
            Err(QueryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_cell() {
        let cell = CellValue::null(DataType::String);
        assert!(cell.is_null());
        assert_eq!(cell.as_string().unwrap(), None);
    }

    #[test]
    fn test_literal_null_normalizes() {
        let cell = CellValue::new(DataType::Int64, Some(Literal::Null)).unwrap();
        assert!(cell.is_null());
    }

    #[test]
    fn test_cell_type_check_on_construction() {
        assert!(matches!(
            CellValue::new(DataType::Int64, Some(Literal::string("nope"))),
            Err(QueryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_row_round_trip() {
        let schema = schema();
        let row = RowResult::new(
            schema,
            vec![
                CellValue::new(DataType::String, Some(Literal::string("Diabetes"))).unwrap(),
                CellValue::new(DataType::Int64, Some(Literal::int64(7))).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(
            row.get_by_name("concept_name").unwrap().as_string().unwrap(),
            Some("Diabetes")
        );
        assert_eq!(row.get_by_name("person_id").unwrap().as_int64().unwrap(), Some(7));
    }

    #[test]
    fn test_row_cell_count_mismatch() {
        let schema = schema();
        assert!(matches!(
            RowResult::new(schema, vec![CellValue::null(DataType::Int64)]),
            Err(QueryError::Inconsistency(_))
        ));
    }

    #[test]
    fn test_row_cell_type_mismatch() {
        let schema = schema();
        assert!(matches!(
            RowResult::new(
                schema,
                vec![
                    CellValue::null(DataType::Int64),
                    CellValue::null(DataType::Int64),
                ]
            ),
            Err(QueryError::TypeMismatch { .. })
        ));
    }
}
