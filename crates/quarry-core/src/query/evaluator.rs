//! Predicate evaluation against stored objects.
//!
//! AND and OR short-circuit left to right. Float and double comparisons
//! follow IEEE 754: NaN is unordered, equal to nothing (itself included)
//! and unequal to everything. Ordering predicates never match a stored
//! null.

use super::predicate::{Comparison, Operand, Operator, Predicate};
use crate::error::{Error, Result};
use crate::storage::{ObjectRef, ObjectSource};
use crate::value::{ObjectKey, ValueRef};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Evaluates predicate trees through an [`ObjectSource`]
pub struct Evaluator<'a, S: ObjectSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ObjectSource + ?Sized> Evaluator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Tests one object. An object of a class other than the one the
    /// predicate was resolved for yields `Error::ClassMismatch` from the
    /// source.
    pub fn matches(&self, object: ObjectRef, predicate: &Predicate) -> Result<bool> {
        match predicate {
            Predicate::Comparison(comparison) => self.compare(object, comparison),
            Predicate::And(left, right) => {
                Ok(self.matches(object, left)? && self.matches(object, right)?)
            }
            Predicate::Or(left, right) => {
                Ok(self.matches(object, left)? || self.matches(object, right)?)
            }
            Predicate::Not(inner) => Ok(!self.matches(object, inner)?),
        }
    }

    fn accepts(&self, object: ObjectRef, predicate: Option<&Predicate>) -> Result<bool> {
        match predicate {
            Some(predicate) => self.matches(object, predicate),
            None => Ok(true),
        }
    }

    /// Every candidate that satisfies `predicate`, in candidate order.
    /// `None` matches everything.
    pub fn filter<I>(&self, candidates: I, predicate: Option<&Predicate>) -> Result<Vec<ObjectRef>>
    where
        I: IntoIterator<Item = ObjectRef>,
    {
        let mut scanned = 0usize;
        let mut matched = Vec::new();
        for object in candidates {
            scanned += 1;
            if self.accepts(object, predicate)? {
                trace!(object = %object, "matched");
                matched.push(object);
            }
        }
        debug!(scanned, matched = matched.len(), "filter complete");
        Ok(matched)
    }

    /// First candidate that satisfies `predicate`.
    pub fn first<I>(&self, candidates: I, predicate: Option<&Predicate>) -> Result<Option<ObjectRef>>
    where
        I: IntoIterator<Item = ObjectRef>,
    {
        for object in candidates {
            if self.accepts(object, predicate)? {
                return Ok(Some(object));
            }
        }
        Ok(None)
    }

    pub fn count<I>(&self, candidates: I, predicate: Option<&Predicate>) -> Result<usize>
    where
        I: IntoIterator<Item = ObjectRef>,
    {
        let mut count = 0;
        for object in candidates {
            if self.accepts(object, predicate)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Follows the link hops of the path, then tests the leaf on every
    /// object reached. Matches if any reached object matches.
    ///
    /// Each hop keeps an object at most once, so a frontier never grows
    /// past the size of the class it points into.
    fn compare(&self, object: ObjectRef, comparison: &Comparison) -> Result<bool> {
        let path = &comparison.path;
        if path.links().is_empty() {
            let value = self.source.value(object, path.leaf())?;
            return Ok(test(&comparison.op, value));
        }

        let mut frontier = vec![object];
        for link in path.links() {
            let target = link.target().ok_or_else(|| {
                Error::Storage(format!("link field '{}' has no target class", link.name()))
            })?;

            let mut seen = HashSet::new();
            let mut next = Vec::new();
            let mut reach = |key: ObjectKey| {
                if seen.insert(key) {
                    next.push(ObjectRef::new(target, key));
                }
            };
            for from in frontier {
                match self.source.value(from, link)? {
                    ValueRef::Null => {}
                    ValueRef::Link(key) => reach(key),
                    ValueRef::LinkList(keys) => keys.iter().copied().for_each(&mut reach),
                    other => {
                        return Err(Error::Storage(format!(
                            "link field '{}' holds {}",
                            link.name(),
                            other
                        )))
                    }
                }
            }
            if next.is_empty() {
                return Ok(false);
            }
            frontier = next;
        }

        for reached in frontier {
            if test(&comparison.op, self.source.value(reached, path.leaf())?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn test(op: &Operator, value: ValueRef<'_>) -> bool {
    match op {
        Operator::Eq(operand) => equals(value, operand),
        Operator::Ne(operand) => !equals(value, operand),
        Operator::Lt(operand) => order(value, operand) == Some(Ordering::Less),
        Operator::Lte(operand) => matches!(
            order(value, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Gt(operand) => order(value, operand) == Some(Ordering::Greater),
        Operator::Gte(operand) => matches!(
            order(value, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Between(low, high) => {
            matches!(
                order(value, low),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(order(value, high), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::BeginsWith(pattern) => {
            matches!(value, ValueRef::String(s) if pattern.begins(s))
        }
        Operator::EndsWith(pattern) => matches!(value, ValueRef::String(s) if pattern.ends(s)),
        Operator::Contains(pattern) => {
            matches!(value, ValueRef::String(s) if pattern.contained_in(s))
        }
    }
}

fn equals(value: ValueRef<'_>, operand: &Operand) -> bool {
    match (value, operand) {
        (ValueRef::Null, Operand::Null) => true,
        (ValueRef::Integer(a), Operand::Integer(b)) => a == *b,
        (ValueRef::Float(a), Operand::Float(b)) => a == *b,
        (ValueRef::Double(a), Operand::Double(b)) => a == *b,
        (ValueRef::Boolean(a), Operand::Boolean(b)) => a == *b,
        (ValueRef::String(a), Operand::Text(pattern)) => pattern.equals(a),
        (ValueRef::Binary(a), Operand::Binary(b)) => a == b.as_slice(),
        (ValueRef::Date(a), Operand::Date(b)) => a == *b,
        _ => false,
    }
}

/// `None` when the pair is unordered (NaN, null, or mixed types).
fn order(value: ValueRef<'_>, operand: &Operand) -> Option<Ordering> {
    match (value, operand) {
        (ValueRef::Integer(a), Operand::Integer(b)) => Some(a.cmp(b)),
        (ValueRef::Float(a), Operand::Float(b)) => a.partial_cmp(b),
        (ValueRef::Double(a), Operand::Double(b)) => a.partial_cmp(b),
        (ValueRef::Date(a), Operand::Date(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
