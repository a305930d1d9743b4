//! Storage seam.
//!
//! The query engine never owns data. It reads through [`ObjectSource`],
//! which the storage layer implements. Implementations must present a
//! read-stable view: nothing may change between the first and the last
//! read of a single evaluation. The engine takes no locks of its own.

use crate::error::Result;
use crate::query::QueryLimits;
use crate::schema::{ClassId, FieldDescriptor, Schema};
use crate::value::{ObjectKey, ValueRef};
use std::fmt;

/// Reference to a stored object together with its class identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    class: ClassId,
    key: ObjectKey,
}

impl ObjectRef {
    pub fn new(class: ClassId, key: ObjectKey) -> Self {
        Self { class, key }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn key(&self) -> ObjectKey {
        self.key
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class, self.key)
    }
}

/// Read access to a consistent snapshot of objects
pub trait ObjectSource {
    /// Schema the stored objects conform to.
    fn schema(&self) -> &Schema;

    /// Keys of the live objects of `class`, in storage order.
    fn object_keys(&self, class: ClassId) -> Result<&[ObjectKey]>;

    /// Reads one field of one object.
    ///
    /// Implementations must reject a descriptor whose owning class differs
    /// from `object.class()` with `Error::ClassMismatch`.
    fn value(&self, object: ObjectRef, field: &FieldDescriptor) -> Result<ValueRef<'_>>;

    /// Limits applied to queries built against this source.
    fn query_limits(&self) -> &QueryLimits {
        &QueryLimits::DEFAULT
    }
}
