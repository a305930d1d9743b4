//! Class tables
//!
//! One table per class: the live object keys in storage order, a key to
//! row index map, and one [`Column`] per field in field-table order.

use crate::column::Column;
use quarry_core::{ClassSchema, Error, ObjectKey, Result};
use std::collections::{HashMap, HashSet};

/// All objects of one class
#[derive(Debug, Clone)]
pub struct ClassTable {
    keys: Vec<ObjectKey>,
    rows: HashMap<ObjectKey, usize>,
    columns: Vec<Column>,
}

impl ClassTable {
    /// Creates an empty table with one column per field
    pub fn new(class: &ClassSchema) -> Self {
        Self {
            keys: Vec::new(),
            rows: HashMap::new(),
            columns: class
                .fields()
                .iter()
                .map(|field| Column::new(field.field_type()))
                .collect(),
        }
    }

    /// Rebuilds a table from persisted parts, checking them against the class
    pub fn from_parts(class: &ClassSchema, keys: Vec<ObjectKey>, columns: Vec<Column>) -> Result<Self> {
        if columns.len() != class.fields().len() {
            return Err(Error::Corruption(format!(
                "class '{}' has {} fields but {} columns were stored",
                class.name(),
                class.fields().len(),
                columns.len()
            )));
        }

        for (field, column) in class.fields().iter().zip(&columns) {
            if column.field_type() != field.field_type() {
                return Err(Error::Corruption(format!(
                    "column '{}.{}' holds {} values, schema says {}",
                    class.name(),
                    field.name(),
                    column.field_type(),
                    field.field_type()
                )));
            }
            if column.len() != keys.len() {
                return Err(Error::Corruption(format!(
                    "column '{}.{}' has {} rows, table has {}",
                    class.name(),
                    field.name(),
                    column.len(),
                    keys.len()
                )));
            }
        }

        let mut rows = HashMap::with_capacity(keys.len());
        for (row, key) in keys.iter().enumerate() {
            if rows.insert(*key, row).is_some() {
                return Err(Error::Corruption(format!(
                    "duplicate key {} in class '{}'",
                    key,
                    class.name()
                )));
            }
        }

        Ok(Self {
            keys,
            rows,
            columns,
        })
    }

    /// Live keys in storage order
    pub fn keys(&self) -> &[ObjectKey] {
        &self.keys
    }

    /// Columns in field-table order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Row index of `key`
    pub fn row(&self, key: ObjectKey) -> Option<usize> {
        self.rows.get(&key).copied()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the table holds no objects
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Appends a row with initial values
    pub(crate) fn push(&mut self, class: &ClassSchema, key: ObjectKey) -> usize {
        let row = self.keys.len();
        self.keys.push(key);
        self.rows.insert(key, row);
        for (column, field) in self.columns.iter_mut().zip(class.fields()) {
            column.push_initial(field.is_nullable());
        }
        row
    }

    /// Removes a row and keeps the remaining rows in order
    pub(crate) fn remove(&mut self, key: ObjectKey) -> Option<usize> {
        let row = self.rows.remove(&key)?;
        self.keys.remove(row);
        for column in &mut self.columns {
            column.remove(row);
        }
        for later in &self.keys[row..] {
            if let Some(index) = self.rows.get_mut(later) {
                *index -= 1;
            }
        }
        Some(row)
    }

    /// Drops every reference to any of `keys` from a link column
    pub(crate) fn unlink(&mut self, column: usize, keys: &HashSet<ObjectKey>) -> usize {
        self.columns
            .get_mut(column)
            .map_or(0, |column| column.unlink(keys))
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
        self.rows.clear();
        for column in &mut self.columns {
            column.clear();
        }
    }
}
