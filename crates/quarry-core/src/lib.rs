//! # Quarry Core
//!
//! Core types for Quarry: the schema registry, field values, the storage
//! seam and the typed predicate query engine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod query;
#[allow(missing_docs)]
pub mod schema;
#[allow(missing_docs)]
pub mod storage;
#[allow(missing_docs)]
pub mod value;

pub use error::{Error, Result};
pub use query::{
    Case, OrderDirection, Predicate, QueryBuilder, QueryExt, QueryLimits, Results,
};
pub use schema::{ClassDef, ClassId, ClassSchema, FieldDef, FieldDescriptor, Schema};
pub use storage::{ObjectRef, ObjectSource};
pub use value::{FieldType, ObjectKey, Timestamp, Value, ValueRef};
