use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::errors::GenerationError;
use crate::value::Value;

/// Generated dataset: named columns of equal length, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    rows: usize,
}

impl OutputTable {
    /// Build a table from named columns, which must have equal lengths and
    /// unique names.
    pub fn new(columns: Vec<(String, Vec<Value>)>) -> Result<Self, GenerationError> {
        let rows = columns.first().map(|(_, column)| column.len()).unwrap_or(0);
        for (position, (name, column)) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(GenerationError::ColumnLength {
                    node: name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
            if columns[..position].iter().any(|(other, _)| other == name) {
                return Err(GenerationError::invalid(format!(
                    "column '{name}' appears more than once"
                )));
            }
        }
        Ok(Self::from_columns(columns, rows))
    }

    pub(crate) fn from_columns(columns: Vec<(String, Vec<Value>)>, rows: usize) -> Self {
        let (names, columns) = columns.into_iter().unzip();
        Self {
            names,
            columns,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|position| self.columns[position].as_slice())
    }

    /// Numeric view of a column; nulls and text become `None`.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.column(name)
            .map(|column| column.iter().map(Value::as_f64).collect())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Values of row `index`, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|column| &column[index]).collect())
    }

    pub fn into_columns(self) -> Vec<(String, Vec<Value>)> {
        self.names.into_iter().zip(self.columns).collect()
    }
}

/// Serializes as a JSON object of columns, keys in output order.
impl Serialize for OutputTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, column) in self.columns() {
            map.serialize_entry(name, column)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OutputTable {
        OutputTable::from_columns(
            vec![
                ("b".to_string(), vec![Value::Int(1), Value::Null]),
                ("a".to_string(), vec![Value::from("x"), Value::Float(0.5)]),
            ],
            2,
        )
    }

    #[test]
    fn lookup_by_name_and_row() {
        let table = table();
        assert_eq!(table.column_names(), ["b", "a"]);
        assert_eq!(table.column("a").unwrap()[1], Value::Float(0.5));
        assert!(table.column("c").is_none());
        assert_eq!(table.row(1).unwrap(), vec![&Value::Null, &Value::Float(0.5)]);
        assert!(table.row(2).is_none());
        assert_eq!(
            table.numeric_column("b").unwrap(),
            vec![Some(1.0), None]
        );
    }

    #[test]
    fn new_checks_lengths_and_names() {
        let err = OutputTable::new(vec![
            ("a".to_string(), vec![Value::Int(1)]),
            ("b".to_string(), vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, GenerationError::ColumnLength { .. }));

        let err = OutputTable::new(vec![
            ("a".to_string(), vec![Value::Int(1)]),
            ("a".to_string(), vec![Value::Int(2)]),
        ])
        .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidParameter(_)));

        assert_eq!(OutputTable::new(Vec::new()).unwrap().row_count(), 0);
    }

    #[test]
    fn json_keeps_column_order() {
        let json = serde_json::to_string(&table()).unwrap();
        assert_eq!(json, r#"{"b":[1,null],"a":["x",0.5]}"#);
    }
}
