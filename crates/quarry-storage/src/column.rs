//! Column - typed per-field storage
//!
//! Each field of a class is stored as one column holding a value per row.
//! Scalar columns use `Option` so nullable fields can hold NULL; rows of
//! non-nullable fields always hold `Some`.

use quarry_core::{Error, FieldDescriptor, FieldType, ObjectKey, Result, Timestamp, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single field's values across all rows of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    /// 64-bit integers
    Integer(Vec<Option<i64>>),
    /// Single precision floats
    Float(Vec<Option<f32>>),
    /// Double precision floats
    Double(Vec<Option<f64>>),
    /// Booleans
    Boolean(Vec<Option<bool>>),
    /// UTF-8 strings
    String(Vec<Option<String>>),
    /// Byte arrays
    Binary(Vec<Option<Vec<u8>>>),
    /// Timestamps
    Date(Vec<Option<Timestamp>>),
    /// Single links (always nullable)
    Link(Vec<Option<ObjectKey>>),
    /// Link lists (empty rather than null)
    LinkList(Vec<Vec<ObjectKey>>),
}

impl Column {
    /// Creates an empty column for a field type
    pub fn new(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Integer => Column::Integer(Vec::new()),
            FieldType::Float => Column::Float(Vec::new()),
            FieldType::Double => Column::Double(Vec::new()),
            FieldType::Boolean => Column::Boolean(Vec::new()),
            FieldType::String => Column::String(Vec::new()),
            FieldType::Binary => Column::Binary(Vec::new()),
            FieldType::Date => Column::Date(Vec::new()),
            FieldType::Link => Column::Link(Vec::new()),
            FieldType::LinkList => Column::LinkList(Vec::new()),
        }
    }

    /// Field type this column stores
    pub fn field_type(&self) -> FieldType {
        match self {
            Column::Integer(_) => FieldType::Integer,
            Column::Float(_) => FieldType::Float,
            Column::Double(_) => FieldType::Double,
            Column::Boolean(_) => FieldType::Boolean,
            Column::String(_) => FieldType::String,
            Column::Binary(_) => FieldType::Binary,
            Column::Date(_) => FieldType::Date,
            Column::Link(_) => FieldType::Link,
            Column::LinkList(_) => FieldType::LinkList,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Column::Integer(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Double(v) => v.len(),
            Column::Boolean(v) => v.len(),
            Column::String(v) => v.len(),
            Column::Binary(v) => v.len(),
            Column::Date(v) => v.len(),
            Column::Link(v) => v.len(),
            Column::LinkList(v) => v.len(),
        }
    }

    /// Returns true if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the initial value of a new row: NULL for nullable fields,
    /// the type's zero value otherwise.
    pub fn push_initial(&mut self, nullable: bool) {
        match self {
            Column::Integer(v) => v.push((!nullable).then_some(0)),
            Column::Float(v) => v.push((!nullable).then_some(0.0)),
            Column::Double(v) => v.push((!nullable).then_some(0.0)),
            Column::Boolean(v) => v.push((!nullable).then_some(false)),
            Column::String(v) => v.push((!nullable).then(String::new)),
            Column::Binary(v) => v.push((!nullable).then(Vec::new)),
            Column::Date(v) => v.push((!nullable).then_some(Timestamp::EPOCH)),
            Column::Link(v) => v.push(None),
            Column::LinkList(v) => v.push(Vec::new()),
        }
    }

    /// Borrowed value at `row`
    pub fn get(&self, row: usize) -> Option<ValueRef<'_>> {
        let value = match self {
            Column::Integer(v) => v.get(row)?.map_or(ValueRef::Null, ValueRef::Integer),
            Column::Float(v) => v.get(row)?.map_or(ValueRef::Null, ValueRef::Float),
            Column::Double(v) => v.get(row)?.map_or(ValueRef::Null, ValueRef::Double),
            Column::Boolean(v) => v.get(row)?.map_or(ValueRef::Null, ValueRef::Boolean),
            Column::String(v) => v
                .get(row)?
                .as_deref()
                .map_or(ValueRef::Null, ValueRef::String),
            Column::Binary(v) => v
                .get(row)?
                .as_deref()
                .map_or(ValueRef::Null, ValueRef::Binary),
            Column::Date(v) => v.get(row)?.map_or(ValueRef::Null, ValueRef::Date),
            Column::Link(v) => v.get(row)?.map_or(ValueRef::Null, ValueRef::Link),
            Column::LinkList(v) => ValueRef::LinkList(v.get(row)?.as_slice()),
        };
        Some(value)
    }

    /// Overwrites the value at `row`.
    ///
    /// Integer values are accepted by float and double columns, and float
    /// values by double columns. NULL is rejected for non-nullable fields.
    pub fn set(&mut self, field: &FieldDescriptor, row: usize, value: Value) -> Result<()> {
        if row >= self.len() {
            return Err(Error::NotFound);
        }
        if value.is_null() && !field.is_nullable() {
            return Err(Error::TypeMismatch {
                field: field.name().to_string(),
                message: "field is not nullable".to_string(),
            });
        }

        let mismatch = |value: &Value| Error::TypeMismatch {
            field: field.name().to_string(),
            message: format!(
                "cannot store a {} value in a {} field",
                value.type_name(),
                field.field_type()
            ),
        };

        match (self, value) {
            (Column::Integer(v), Value::Integer(x)) => v[row] = Some(x),
            (Column::Integer(v), Value::Null) => v[row] = None,
            (Column::Float(v), Value::Float(x)) => v[row] = Some(x),
            (Column::Float(v), Value::Integer(x)) => v[row] = Some(x as f32),
            (Column::Float(v), Value::Null) => v[row] = None,
            (Column::Double(v), Value::Double(x)) => v[row] = Some(x),
            (Column::Double(v), Value::Float(x)) => v[row] = Some(x as f64),
            (Column::Double(v), Value::Integer(x)) => v[row] = Some(x as f64),
            (Column::Double(v), Value::Null) => v[row] = None,
            (Column::Boolean(v), Value::Boolean(x)) => v[row] = Some(x),
            (Column::Boolean(v), Value::Null) => v[row] = None,
            (Column::String(v), Value::String(x)) => v[row] = Some(x),
            (Column::String(v), Value::Null) => v[row] = None,
            (Column::Binary(v), Value::Binary(x)) => v[row] = Some(x),
            (Column::Binary(v), Value::Null) => v[row] = None,
            (Column::Date(v), Value::Date(x)) => v[row] = Some(x),
            (Column::Date(v), Value::Null) => v[row] = None,
            (Column::Link(v), Value::Link(x)) => v[row] = Some(x),
            (Column::Link(v), Value::Null) => v[row] = None,
            (Column::LinkList(v), Value::LinkList(x)) => v[row] = x,
            (Column::LinkList(v), Value::Null) => v[row].clear(),
            (_, value) => return Err(mismatch(&value)),
        }
        Ok(())
    }

    /// Appends `key` to a link list, or sets a single link.
    pub fn add_link(&mut self, row: usize, key: ObjectKey) -> Result<()> {
        if row >= self.len() {
            return Err(Error::NotFound);
        }
        match self {
            Column::Link(v) => v[row] = Some(key),
            Column::LinkList(v) => v[row].push(key),
            other => {
                return Err(Error::InvalidOperation(format!(
                    "cannot add a link to a {} column",
                    other.field_type()
                )))
            }
        }
        Ok(())
    }

    /// Removes a row, shifting later rows down
    pub fn remove(&mut self, row: usize) {
        match self {
            Column::Integer(v) => drop(v.remove(row)),
            Column::Float(v) => drop(v.remove(row)),
            Column::Double(v) => drop(v.remove(row)),
            Column::Boolean(v) => drop(v.remove(row)),
            Column::String(v) => drop(v.remove(row)),
            Column::Binary(v) => drop(v.remove(row)),
            Column::Date(v) => drop(v.remove(row)),
            Column::Link(v) => drop(v.remove(row)),
            Column::LinkList(v) => drop(v.remove(row)),
        }
    }

    /// Drops every reference to any of `keys` in one pass, returning how
    /// many were removed.
    ///
    /// Only meaningful for link columns whose target class owns `keys`.
    pub fn unlink(&mut self, keys: &HashSet<ObjectKey>) -> usize {
        if keys.is_empty() {
            return 0;
        }
        match self {
            Column::Link(v) => {
                let mut removed = 0;
                for slot in v.iter_mut() {
                    if slot.is_some_and(|key| keys.contains(&key)) {
                        *slot = None;
                        removed += 1;
                    }
                }
                removed
            }
            Column::LinkList(v) => v
                .iter_mut()
                .map(|list| {
                    let before = list.len();
                    list.retain(|key| !keys.contains(key));
                    before - list.len()
                })
                .sum(),
            _ => 0,
        }
    }

    /// Empties the column
    pub fn clear(&mut self) {
        match self {
            Column::Integer(v) => v.clear(),
            Column::Float(v) => v.clear(),
            Column::Double(v) => v.clear(),
            Column::Boolean(v) => v.clear(),
            Column::String(v) => v.clear(),
            Column::Binary(v) => v.clear(),
            Column::Date(v) => v.clear(),
            Column::Link(v) => v.clear(),
            Column::LinkList(v) => v.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_initial_values() {
        let mut col = Column::new(FieldType::Integer);
        col.push_initial(false);
        col.push_initial(true);

        assert_eq!(col.len(), 2);
        assert_eq!(col.get(0), Some(ValueRef::Integer(0)));
        assert_eq!(col.get(1), Some(ValueRef::Null));
        assert_eq!(col.get(2), None);

        let mut links = Column::new(FieldType::LinkList);
        links.push_initial(true);
        assert_eq!(links.get(0), Some(ValueRef::LinkList(&[])));
    }

    #[test]
    fn test_column_remove_shifts_rows() {
        let mut col = Column::new(FieldType::String);
        for _ in 0..3 {
            col.push_initial(false);
        }
        if let Column::String(v) = &mut col {
            v[0] = Some("a".into());
            v[1] = Some("b".into());
            v[2] = Some("c".into());
        }

        col.remove(1);
        assert_eq!(col.len(), 2);
        assert_eq!(col.get(1), Some(ValueRef::String("c")));
    }

    #[test]
    fn test_column_unlink() {
        let mut col = Column::LinkList(vec![
            vec![ObjectKey(1), ObjectKey(2), ObjectKey(1)],
            vec![ObjectKey(3)],
        ]);
        assert_eq!(col.unlink(&HashSet::from([ObjectKey(1)])), 2);
        assert_eq!(col.get(0), Some(ValueRef::LinkList(&[ObjectKey(2)])));

        let mut single = Column::Link(vec![Some(ObjectKey(3)), None, Some(ObjectKey(4))]);
        assert_eq!(single.unlink(&HashSet::from([ObjectKey(3), ObjectKey(4)])), 2);
        assert_eq!(single.get(0), Some(ValueRef::Null));
        assert_eq!(single.get(2), Some(ValueRef::Null));
        assert_eq!(single.unlink(&HashSet::new()), 0);
    }

    #[test]
    fn test_column_writes_check_row_bounds() {
        let field = quarry_core::Schema::from_definitions(vec![quarry_core::ClassDef::new("Row")
            .field("n", FieldType::Integer)])
        .unwrap()
        .field_descriptor("Row", "n")
        .unwrap()
        .clone();

        let mut col = Column::new(FieldType::Integer);
        col.push_initial(false);
        assert!(col.set(&field, 0, Value::Integer(5)).is_ok());
        assert!(matches!(col.set(&field, 1, Value::Integer(5)), Err(Error::NotFound)));

        let mut links = Column::new(FieldType::LinkList);
        assert!(matches!(links.add_link(0, ObjectKey(1)), Err(Error::NotFound)));
        links.push_initial(true);
        assert!(links.add_link(0, ObjectKey(1)).is_ok());
    }
}
