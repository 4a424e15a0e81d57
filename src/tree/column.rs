use std::fmt;

use crate::model::{Value, ValueKind};

use super::TreeError;

/// A typed projection from a row to one cell value
pub struct Column<T> {
    kind: ValueKind,
    extract: Box<dyn Fn(&T) -> Value>,
}

impl<T> Column<T> {
    pub fn new(kind: ValueKind, extract: impl Fn(&T) -> Value + 'static) -> Self {
        Column {
            kind,
            extract: Box::new(extract),
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column").field("kind", &self.kind).finish()
    }
}

/// The fixed, non-empty list of columns a tree exposes
#[derive(Debug)]
pub struct ColumnSet<T> {
    columns: Vec<Column<T>>,
}

impl<T> ColumnSet<T> {
    pub fn new(columns: Vec<Column<T>>) -> Result<Self, TreeError> {
        if columns.is_empty() {
            return Err(TreeError::NoColumns);
        }
        Ok(ColumnSet { columns })
    }

    /// A set holding one column
    pub fn single(kind: ValueKind, extract: impl Fn(&T) -> Value + 'static) -> Self {
        ColumnSet {
            columns: vec![Column::new(kind, extract)],
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn kind(&self, column: usize) -> Result<ValueKind, TreeError> {
        self.columns
            .get(column)
            .map(Column::kind)
            .ok_or(TreeError::ColumnOutOfRange {
                column,
                n_columns: self.columns.len(),
            })
    }

    pub fn kinds(&self) -> Vec<ValueKind> {
        self.columns.iter().map(Column::kind).collect()
    }

    /// Project `row` through `column`, checking the declared kind
    pub fn extract(&self, row: &T, column: usize) -> Result<Value, TreeError> {
        let col = self.columns.get(column).ok_or(TreeError::ColumnOutOfRange {
            column,
            n_columns: self.columns.len(),
        })?;
        let value = (col.extract)(row);
        match value.kind() {
            Some(found) if found != col.kind => Err(TreeError::ValueKindMismatch {
                column,
                expected: col.kind,
                found,
            }),
            _ => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_columns() -> ColumnSet<String> {
        ColumnSet::new(vec![
            Column::new(ValueKind::Text, |s: &String| Value::from(s.as_str())),
            Column::new(ValueKind::Integer, |s: &String| Value::Integer(s.len() as i64)),
            Column::new(ValueKind::Boolean, |_: &String| Value::Integer(0)),
        ])
        .unwrap()
    }

    #[test]
    fn empty_set_is_rejected() {
        let result = ColumnSet::<String>::new(Vec::new());
        assert!(matches!(result, Err(TreeError::NoColumns)));
    }

    #[test]
    fn extracts_by_column() {
        let columns = word_columns();
        let row = "hello".to_string();
        assert_eq!(columns.extract(&row, 0).unwrap(), Value::Text("hello".into()));
        assert_eq!(columns.extract(&row, 1).unwrap(), Value::Integer(5));
        assert_eq!(
            columns.kinds(),
            vec![ValueKind::Text, ValueKind::Integer, ValueKind::Boolean]
        );
    }

    #[test]
    fn wrong_kind_is_reported() {
        let columns = word_columns();
        let err = columns.extract(&"x".to_string(), 2).unwrap_err();
        assert!(matches!(
            err,
            TreeError::ValueKindMismatch {
                column: 2,
                expected: ValueKind::Boolean,
                found: ValueKind::Integer,
            }
        ));
    }

    #[test]
    fn column_out_of_range() {
        let columns = word_columns();
        assert!(matches!(
            columns.extract(&"x".to_string(), 3),
            Err(TreeError::ColumnOutOfRange { column: 3, n_columns: 3 })
        ));
    }
}
