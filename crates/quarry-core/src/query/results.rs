//! Result sets.
//!
//! A [`Results`] is an ordered, materialised list of object references of a
//! single class. It can be sorted, aggregated and re-queried; a query
//! opened from a result set only ever sees that set's members.

use super::builder::QueryBuilder;
use crate::error::{Error, Result};
use crate::schema::{ClassId, FieldDescriptor};
use crate::storage::{ObjectRef, ObjectSource};
use crate::value::{FieldType, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Nulls first, then ascending values
    #[default]
    Asc,
    /// Reverse of [`OrderDirection::Asc`]
    Desc,
}

/// Ordered set of matching objects
pub struct Results<'a, S: ObjectSource + ?Sized> {
    source: &'a S,
    class: ClassId,
    objects: Arc<[ObjectRef]>,
}

impl<'a, S: ObjectSource + ?Sized> Clone for Results<'a, S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            class: self.class,
            objects: Arc::clone(&self.objects),
        }
    }
}

impl<'a, S: ObjectSource + ?Sized> fmt::Debug for Results<'a, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("class", &self.class)
            .field("len", &self.objects.len())
            .finish()
    }
}

impl<'a, S: ObjectSource + ?Sized> Results<'a, S> {
    pub(crate) fn new(source: &'a S, class: ClassId, objects: Vec<ObjectRef>) -> Self {
        Self {
            source,
            class,
            objects: objects.into(),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ObjectRef> {
        self.objects.get(index).copied()
    }

    pub fn first(&self) -> Option<ObjectRef> {
        self.objects.first().copied()
    }

    pub fn last(&self) -> Option<ObjectRef> {
        self.objects.last().copied()
    }

    pub fn contains(&self, object: ObjectRef) -> bool {
        self.objects.contains(&object)
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.objects.iter().copied()
    }

    pub fn as_slice(&self) -> &[ObjectRef] {
        &self.objects
    }

    /// Opens a query whose candidates are exactly this set's members, in
    /// this set's order.
    pub fn query(&self) -> QueryBuilder<'a, S> {
        QueryBuilder::over_members(self.source, self.class, Arc::clone(&self.objects))
    }

    fn field(&self, name: &str) -> Result<&'a FieldDescriptor> {
        let source: &'a S = self.source;
        source.schema().class(self.class)?.field(name)
    }

    fn sort_field(&self, name: &str) -> Result<&'a FieldDescriptor> {
        let field = self.field(name)?;
        if field.field_type().is_link() {
            return Err(Error::type_mismatch(
                name,
                format!("cannot sort by a {} field", field.field_type()),
            ));
        }
        Ok(field)
    }

    fn keyed(&self, field: &FieldDescriptor) -> Result<Vec<(ValueRef<'a>, ObjectRef)>> {
        let source: &'a S = self.source;
        self.objects
            .iter()
            .map(|&object| Ok((source.value(object, field)?, object)))
            .collect()
    }

    /// Stable sort by one field.
    ///
    /// Ascending puts nulls first; NaN sorts by IEEE total order (after all
    /// numbers for positive NaN).
    pub fn sorted(&self, field: &str, direction: OrderDirection) -> Result<Results<'a, S>> {
        let field = self.sort_field(field)?;
        let mut keyed = self.keyed(field)?;
        keyed.sort_by(|(a, _), (b, _)| directed(sort_order(a, b), direction));
        let objects = keyed.into_iter().map(|(_, object)| object).collect();
        Ok(Results::new(self.source, self.class, objects))
    }

    /// The object a [`sorted`](Self::sorted) call would put first, without
    /// sorting the whole set.
    pub fn find_first_sorted(
        &self,
        field: &str,
        direction: OrderDirection,
    ) -> Result<Option<ObjectRef>> {
        let field = self.sort_field(field)?;
        let mut best: Option<(ValueRef<'a>, ObjectRef)> = None;
        for (value, object) in self.keyed(field)? {
            let better = match &best {
                None => true,
                Some((current, _)) => {
                    directed(sort_order(&value, current), direction) == Ordering::Less
                }
            };
            if better {
                best = Some((value, object));
            }
        }
        Ok(best.map(|(_, object)| object))
    }

    fn numeric_field(&self, name: &str, op: &str) -> Result<&'a FieldDescriptor> {
        let field = self.field(name)?;
        match field.field_type() {
            FieldType::Integer | FieldType::Float | FieldType::Double => Ok(field),
            other => Err(Error::type_mismatch(
                name,
                format!("{} is not supported on {} fields", op, other),
            )),
        }
    }

    /// Sum of a numeric field, skipping nulls. Integer fields sum to an
    /// integer; float and double fields sum in double precision.
    pub fn sum(&self, field: &str) -> Result<Value> {
        let field = self.numeric_field(field, "sum")?;
        if field.field_type() == FieldType::Integer {
            let mut total: i64 = 0;
            for (value, _) in self.keyed(field)? {
                if let ValueRef::Integer(v) = value {
                    total = total.checked_add(v).ok_or_else(|| {
                        Error::InvalidOperation(format!("sum of '{}' overflows", field.name()))
                    })?;
                }
            }
            return Ok(Value::Integer(total));
        }

        let total = self
            .keyed(field)?
            .into_iter()
            .filter_map(|(value, _)| as_f64(value))
            .sum();
        Ok(Value::Double(total))
    }

    /// Mean of a numeric field over its non-null values.
    pub fn average(&self, field: &str) -> Result<Option<f64>> {
        let field = self.numeric_field(field, "average")?;
        let values: Vec<f64> = self
            .keyed(field)?
            .into_iter()
            .filter_map(|(value, _)| as_f64(value))
            .collect();
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    pub fn min(&self, field: &str) -> Result<Option<Value>> {
        self.extreme(field, "min", Ordering::Less)
    }

    pub fn max(&self, field: &str) -> Result<Option<Value>> {
        self.extreme(field, "max", Ordering::Greater)
    }

    /// Smallest or largest non-null, non-NaN value of an orderable field.
    fn extreme(&self, name: &str, op: &str, wanted: Ordering) -> Result<Option<Value>> {
        let field = self.field(name)?;
        if !field.field_type().is_orderable() {
            return Err(Error::type_mismatch(
                name,
                format!("{} is not supported on {} fields", op, field.field_type()),
            ));
        }

        let mut best: Option<ValueRef<'a>> = None;
        for (value, _) in self.keyed(field)? {
            if value.is_null() || is_nan(value) {
                continue;
            }
            best = match best {
                Some(current) if sort_order(&value, &current) != wanted => Some(current),
                _ => Some(value),
            };
        }
        Ok(best.map(|v| v.to_value()))
    }
}

impl<'r, 'a, S: ObjectSource + ?Sized> IntoIterator for &'r Results<'a, S> {
    type Item = ObjectRef;
    type IntoIter = std::iter::Copied<std::slice::Iter<'r, ObjectRef>>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter().copied()
    }
}

fn directed(ordering: Ordering, direction: OrderDirection) -> Ordering {
    match direction {
        OrderDirection::Asc => ordering,
        OrderDirection::Desc => ordering.reverse(),
    }
}

fn as_f64(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(v) => Some(v as f64),
        ValueRef::Float(v) => Some(v as f64),
        ValueRef::Double(v) => Some(v),
        _ => None,
    }
}

fn is_nan(value: ValueRef<'_>) -> bool {
    match value {
        ValueRef::Float(v) => v.is_nan(),
        ValueRef::Double(v) => v.is_nan(),
        _ => false,
    }
}

/// Total order used for sorting values of one field.
fn sort_order(a: &ValueRef<'_>, b: &ValueRef<'_>) -> Ordering {
    match (a, b) {
        (ValueRef::Null, ValueRef::Null) => Ordering::Equal,
        (ValueRef::Null, _) => Ordering::Less,
        (_, ValueRef::Null) => Ordering::Greater,
        (ValueRef::Integer(x), ValueRef::Integer(y)) => x.cmp(y),
        (ValueRef::Float(x), ValueRef::Float(y)) => x.total_cmp(y),
        (ValueRef::Double(x), ValueRef::Double(y)) => x.total_cmp(y),
        (ValueRef::Boolean(x), ValueRef::Boolean(y)) => x.cmp(y),
        (ValueRef::String(x), ValueRef::String(y)) => x.cmp(y),
        (ValueRef::Binary(x), ValueRef::Binary(y)) => x.cmp(y),
        (ValueRef::Date(x), ValueRef::Date(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
