//! # Quarry Storage
//!
//! Columnar in-memory object store for Quarry.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of Quarry.**
//!
//! Users should depend on the main `quarry` crate instead, which provides
//! the stable public API. This crate's API may change without notice
//! between minor versions.
//!
//! ---
//!
//! Objects of each class live in a [`ClassTable`]: one typed [`Column`] per
//! field, rows in insertion order. The [`Store`] implements
//! [`ObjectSource`], so queries run directly against the columns.
//!
//! ```text
//! Store ─┬─ ClassTable (Owner) ── name | dogs
//!        └─ ClassTable (Dog)   ── name | age | height | birthday | weight
//! ```

use quarry_core::{
    ClassId, ClassSchema, Error, FieldDescriptor, ObjectKey, ObjectRef, ObjectSource, QueryLimits,
    Result, Schema, Value, ValueRef,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

pub mod column;
pub mod table;

pub use column::Column;
pub use table::ClassTable;

/// Default cap on live objects per class
const DEFAULT_MAX_OBJECTS_PER_CLASS: usize = 16 * 1024 * 1024;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Limits applied to queries against this store
    pub query_limits: QueryLimits,
    /// Maximum number of live objects in a single class
    pub max_objects_per_class: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            query_limits: QueryLimits::default(),
            max_objects_per_class: DEFAULT_MAX_OBJECTS_PER_CLASS,
        }
    }
}

/// In-memory columnar object store
///
/// Writes take `&mut self`; readers hold `&Store` (or an `Arc<Store>`), so
/// a store cannot change while a query is evaluating against it.
#[derive(Debug, Clone)]
pub struct Store {
    schema: Arc<Schema>,
    tables: Vec<ClassTable>,
    next_key: u64,
    config: StoreConfig,
}

impl Store {
    /// Creates an empty store for a schema
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, StoreConfig::default())
    }

    /// Creates an empty store with custom configuration
    pub fn with_config(schema: Schema, config: StoreConfig) -> Self {
        let tables = schema.classes().iter().map(ClassTable::new).collect();
        Self {
            schema: Arc::new(schema),
            tables,
            next_key: 0,
            config,
        }
    }

    /// Rebuilds a store from persisted parts
    ///
    /// Fails with `Error::Corruption` if the tables do not fit the schema or
    /// if a key is at or above `next_key`.
    pub fn from_parts(
        schema: Schema,
        tables: Vec<(Vec<ObjectKey>, Vec<Column>)>,
        next_key: u64,
        config: StoreConfig,
    ) -> Result<Self> {
        if tables.len() != schema.classes().len() {
            return Err(Error::Corruption(format!(
                "schema has {} classes but {} tables were stored",
                schema.classes().len(),
                tables.len()
            )));
        }

        let tables = schema
            .classes()
            .iter()
            .zip(tables)
            .map(|(class, (keys, columns))| {
                if let Some(key) = keys.iter().find(|key| key.0 >= next_key) {
                    return Err(Error::Corruption(format!(
                        "key {} in class '{}' is beyond the key counter {}",
                        key,
                        class.name(),
                        next_key
                    )));
                }
                ClassTable::from_parts(class, keys, columns)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            classes = tables.len(),
            objects = tables.iter().map(ClassTable::len).sum::<usize>(),
            "Store rebuilt"
        );

        Ok(Self {
            schema: Arc::new(schema),
            tables,
            next_key,
            config,
        })
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Tables in class-id order
    pub fn tables(&self) -> &[ClassTable] {
        &self.tables
    }

    /// Next key that will be handed out
    pub fn next_key(&self) -> u64 {
        self.next_key
    }

    fn class(&self, name: &str) -> Result<&ClassSchema> {
        self.schema.class_by_name(name)
    }

    fn table(&self, class: ClassId) -> Result<&ClassTable> {
        self.tables
            .get(class.index())
            .ok_or_else(|| Error::UnknownClass(class.to_string()))
    }

    fn table_mut(&mut self, class: ClassId) -> Result<&mut ClassTable> {
        self.tables
            .get_mut(class.index())
            .ok_or_else(|| Error::UnknownClass(class.to_string()))
    }

    fn class_name(&self, class: ClassId) -> String {
        self.schema
            .class(class)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|_| class.to_string())
    }

    /// Row of a live object
    fn locate(&self, object: ObjectRef) -> Result<(&ClassTable, usize)> {
        let table = self.table(object.class())?;
        let row = table.row(object.key()).ok_or(Error::NotFound)?;
        Ok((table, row))
    }

    /// Returns true if `object` is live
    pub fn contains(&self, object: ObjectRef) -> bool {
        self.locate(object).is_ok()
    }

    /// Number of live objects in a class
    pub fn count(&self, class: &str) -> Result<usize> {
        let id = self.class(class)?.id();
        Ok(self.table(id)?.len())
    }

    /// Creates an object with initial field values
    pub fn create_object(&mut self, class: &str) -> Result<ObjectRef> {
        let schema = Arc::clone(&self.schema);
        let class = schema.class_by_name(class)?;
        let limit = self.config.max_objects_per_class;

        let key = ObjectKey(self.next_key);
        let table = self.table_mut(class.id())?;
        if table.len() >= limit {
            return Err(Error::Storage(format!(
                "class '{}' is full ({} objects)",
                class.name(),
                limit
            )));
        }
        table.push(class, key);
        self.next_key += 1;

        trace!(class = class.name(), key = %key, "Object created");
        Ok(ObjectRef::new(class.id(), key))
    }

    /// Creates an object and sets the given fields
    pub fn insert<'v, I>(&mut self, class: &str, fields: I) -> Result<ObjectRef>
    where
        I: IntoIterator<Item = (&'v str, Value)>,
    {
        let object = self.create_object(class)?;
        for (field, value) in fields {
            if let Err(err) = self.set(object, field, value) {
                // leave no half-written object behind
                self.delete_object(object)?;
                return Err(err);
            }
        }
        Ok(object)
    }

    /// Sets one field of a live object
    pub fn set(&mut self, object: ObjectRef, field: &str, value: impl Into<Value>) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let descriptor = schema.class(object.class())?.field(field)?;
        let value = value.into();

        match &value {
            Value::Link(key) => self.check_target(descriptor, *key)?,
            Value::LinkList(keys) => {
                for key in keys {
                    self.check_target(descriptor, *key)?;
                }
            }
            _ => {}
        }

        let table = self.table_mut(object.class())?;
        let row = table.row(object.key()).ok_or(Error::NotFound)?;
        let column = table
            .column_mut(descriptor.index())
            .ok_or_else(|| Error::Storage(format!("missing column for '{}'", field)))?;
        column.set(descriptor, row, value)
    }

    /// Points a link field at `target`: sets a single link, or appends to a
    /// link list.
    pub fn add_link(&mut self, object: ObjectRef, field: &str, target: ObjectRef) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let descriptor = schema.class(object.class())?.field(field)?;
        if descriptor.target() != Some(target.class()) {
            return Err(Error::ClassMismatch {
                expected: descriptor
                    .target()
                    .map_or_else(|| descriptor.field_type().to_string(), |c| self.class_name(c)),
                found: self.class_name(target.class()),
            });
        }
        self.check_target(descriptor, target.key())?;

        let table = self.table_mut(object.class())?;
        let row = table.row(object.key()).ok_or(Error::NotFound)?;
        let column = table
            .column_mut(descriptor.index())
            .ok_or_else(|| Error::Storage(format!("missing column for '{}'", field)))?;
        column.add_link(row, target.key())
    }

    fn check_target(&self, field: &FieldDescriptor, key: ObjectKey) -> Result<()> {
        let target = field.target().ok_or_else(|| Error::TypeMismatch {
            field: field.name().to_string(),
            message: format!("{} field cannot hold links", field.field_type()),
        })?;
        if self.table(target)?.row(key).is_none() {
            return Err(Error::InvalidInput(format!(
                "link target {} of '{}' does not exist",
                key,
                field.name()
            )));
        }
        Ok(())
    }

    /// Deletes an object and removes every link pointing at it
    pub fn delete_object(&mut self, object: ObjectRef) -> Result<()> {
        self.table_mut(object.class())?
            .remove(object.key())
            .ok_or(Error::NotFound)?;

        let unlinked = self.unlink_all(object.class(), &HashSet::from([object.key()]))?;
        trace!(object = %object, unlinked, "Object deleted");
        Ok(())
    }

    /// Removes `keys` of class `target` from every link column aimed at it
    fn unlink_all(&mut self, target: ClassId, keys: &HashSet<ObjectKey>) -> Result<usize> {
        let schema = Arc::clone(&self.schema);
        let mut unlinked = 0;
        for class in schema.classes() {
            for field in class.fields() {
                if field.target() == Some(target) {
                    unlinked += self.table_mut(class.id())?.unlink(field.index(), keys);
                }
            }
        }
        Ok(unlinked)
    }

    /// Deletes every object of a class
    ///
    /// Runs one pass per incoming link column regardless of how many objects
    /// the class holds.
    pub fn clear(&mut self, class: &str) -> Result<()> {
        let id = self.class(class)?.id();
        let table = self.table_mut(id)?;
        let keys: HashSet<ObjectKey> = table.keys().iter().copied().collect();
        table.clear();

        let unlinked = self.unlink_all(id, &keys)?;
        debug!(class, objects = keys.len(), unlinked, "Class cleared");
        Ok(())
    }
}

impl ObjectSource for Store {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn object_keys(&self, class: ClassId) -> Result<&[ObjectKey]> {
        Ok(self.table(class)?.keys())
    }

    fn value(&self, object: ObjectRef, field: &FieldDescriptor) -> Result<ValueRef<'_>> {
        if field.class() != object.class() {
            return Err(Error::ClassMismatch {
                expected: self.class_name(field.class()),
                found: self.class_name(object.class()),
            });
        }
        let (table, row) = self.locate(object)?;
        table
            .column(field.index())
            .and_then(|column| column.get(row))
            .ok_or_else(|| Error::Storage(format!("missing value for '{}'", field.name())))
    }

    fn query_limits(&self) -> &QueryLimits {
        &self.config.query_limits
    }
}
