//! Query engine module
//!
//! Typed predicate construction, evaluation and result sets.

/// Chainable query builder
#[allow(missing_docs)]
pub mod builder;
/// Predicate evaluation
#[allow(missing_docs)]
pub mod evaluator;
/// Unicode case folding for string predicates
#[allow(missing_docs)]
pub mod fold;
/// Construction limits
pub mod limits;
/// Predicate tree types
#[allow(missing_docs)]
pub mod predicate;
/// Result sets, sorting and aggregates
#[allow(missing_docs)]
pub mod results;
#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use builder::QueryBuilder;
pub use evaluator::Evaluator;
pub use fold::{fold, Case, TextPattern};
pub use limits::QueryLimits;
pub use predicate::{Comparison, FieldPath, Operand, Operator, Predicate};
pub use results::{OrderDirection, Results};

use crate::error::{Error, Result};
use crate::storage::{ObjectRef, ObjectSource};
use crate::value::{Value, ValueRef};

/// Entry points for querying any [`ObjectSource`]
pub trait QueryExt: ObjectSource {
    /// Opens a query over every object of `class`.
    fn query(&self, class: &str) -> Result<QueryBuilder<'_, Self>> {
        QueryBuilder::new(self, class)
    }

    /// Every object of `class`, in storage order.
    fn all_objects(&self, class: &str) -> Result<Results<'_, Self>> {
        self.query(class)?.find_all()
    }

    /// Reads one field of one object by name.
    fn get(&self, object: ObjectRef, field: &str) -> Result<Value> {
        let descriptor = self.schema().class(object.class())?.field(field)?;
        Ok(self.value(object, descriptor)?.to_value())
    }

    /// The objects a link-list field points to, as a queryable result set.
    ///
    /// Queries opened from the returned set resolve fields against the
    /// linked class, not against the class of `object`.
    fn link_list(&self, object: ObjectRef, field: &str) -> Result<Results<'_, Self>> {
        let descriptor = self.schema().class(object.class())?.field(field)?;
        let target = match descriptor.target() {
            Some(target) if descriptor.field_type().is_link() => target,
            _ => {
                return Err(Error::type_mismatch(
                    field,
                    format!("{} field is not a link", descriptor.field_type()),
                ))
            }
        };

        let members = match self.value(object, descriptor)? {
            ValueRef::Null => Vec::new(),
            ValueRef::Link(key) => vec![ObjectRef::new(target, key)],
            ValueRef::LinkList(keys) => keys.iter().map(|&key| ObjectRef::new(target, key)).collect(),
            other => {
                return Err(Error::Storage(format!(
                    "link field '{}' holds {}",
                    field, other
                )))
            }
        };
        Ok(Results::new(self, target, members))
    }

    /// Target of a single-link field, if set.
    fn link(&self, object: ObjectRef, field: &str) -> Result<Option<ObjectRef>> {
        Ok(self.link_list(object, field)?.first())
    }
}

impl<S: ObjectSource + ?Sized> QueryExt for S {}
