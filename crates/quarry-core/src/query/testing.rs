//! Row-oriented source for unit tests.

use crate::error::{Error, Result};
use crate::schema::{ClassDef, ClassId, FieldDescriptor, Schema};
use crate::storage::{ObjectRef, ObjectSource};
use crate::value::{ObjectKey, Value, ValueRef};
use std::collections::HashMap;

pub(crate) struct MemorySource {
    schema: Schema,
    keys: Vec<Vec<ObjectKey>>,
    rows: HashMap<ObjectRef, Vec<Value>>,
    next_key: u64,
}

impl MemorySource {
    pub(crate) fn new(definitions: Vec<ClassDef>) -> Self {
        let schema = Schema::from_definitions(definitions).unwrap();
        let keys = vec![Vec::new(); schema.classes().len()];
        Self {
            schema,
            keys,
            rows: HashMap::new(),
            next_key: 0,
        }
    }

    /// Inserts a row given in field-table order.
    pub(crate) fn insert(&mut self, class: &str, row: Vec<Value>) -> ObjectRef {
        let class = self.schema.class_by_name(class).unwrap();
        assert_eq!(class.fields().len(), row.len());
        let object = ObjectRef::new(class.id(), ObjectKey(self.next_key));
        self.next_key += 1;
        self.keys[class.id().index()].push(object.key());
        self.rows.insert(object, row);
        object
    }
}

impl ObjectSource for MemorySource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn object_keys(&self, class: ClassId) -> Result<&[ObjectKey]> {
        self.keys
            .get(class.index())
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownClass(class.to_string()))
    }

    fn value(&self, object: ObjectRef, field: &FieldDescriptor) -> Result<ValueRef<'_>> {
        if field.class() != object.class() {
            return Err(Error::ClassMismatch {
                expected: field.class().to_string(),
                found: object.class().to_string(),
            });
        }
        let row = self.rows.get(&object).ok_or(Error::NotFound)?;
        Ok(row[field.index()].as_value_ref())
    }
}
