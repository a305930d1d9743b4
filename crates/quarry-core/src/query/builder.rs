//! Chainable query builder.
//!
//! Every chain call consumes the builder and returns it extended (or an
//! error). Combinator state (`or()`, `not()`, open groups) is part of the
//! builder value, so cloning a builder forks the whole chain state.
//!
//! Combination rules:
//! - a predicate not preceded by `or()` is ANDed onto the current tree at
//!   its root;
//! - `or()` makes exactly the next predicate (or group) an OR against
//!   everything built so far in the current group.
//!
//! `a.or().b().c()` therefore means `(a OR b) AND c`.

use super::evaluator::Evaluator;
use super::fold::{Case, TextPattern};
use super::limits::QueryLimits;
use super::predicate::{Comparison, FieldPath, Operand, Operator, Predicate};
use super::results::{OrderDirection, Results};
use crate::error::{Error, Result};
use crate::schema::{ClassId, FieldDescriptor};
use crate::storage::{ObjectRef, ObjectSource};
use crate::value::{FieldType, ObjectKey, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Objects a query may match
#[derive(Debug, Clone)]
enum Scope {
    /// Every live object of the class
    Class,
    /// Members of an earlier result set, in that set's order
    Members(Arc<[ObjectRef]>),
}

#[derive(Debug, Clone, Default)]
struct Frame {
    tree: Option<Predicate>,
    pending_or: bool,
    negate_next: bool,
}

impl Frame {
    fn append(&mut self, predicate: Predicate) {
        let predicate = if self.negate_next {
            predicate.negate()
        } else {
            predicate
        };
        self.tree = Some(match self.tree.take() {
            None => predicate,
            Some(tree) if self.pending_or => tree.or(predicate),
            Some(tree) => tree.and(predicate),
        });
        self.pending_or = false;
        self.negate_next = false;
    }

    fn dangling(&self) -> Option<&'static str> {
        if self.pending_or {
            Some("or() is missing its right-hand side")
        } else if self.negate_next {
            Some("not() is missing the predicate it negates")
        } else {
            None
        }
    }
}

/// Query under construction against one class
pub struct QueryBuilder<'a, S: ObjectSource + ?Sized> {
    source: &'a S,
    class: ClassId,
    scope: Scope,
    root: Frame,
    groups: Vec<Frame>,
}

impl<'a, S: ObjectSource + ?Sized> Clone for QueryBuilder<'a, S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            class: self.class,
            scope: self.scope.clone(),
            root: self.root.clone(),
            groups: self.groups.clone(),
        }
    }
}

impl<'a, S: ObjectSource + ?Sized> fmt::Debug for QueryBuilder<'a, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("class", &self.class)
            .field("scope", &self.scope)
            .field("root", &self.root)
            .field("open_groups", &self.groups.len())
            .finish()
    }
}

impl<'a, S: ObjectSource + ?Sized> QueryBuilder<'a, S> {
    /// Opens a query over every object of `class`.
    pub fn new(source: &'a S, class: &str) -> Result<Self> {
        let class = source.schema().class_by_name(class)?.id();
        Ok(Self::with_scope(source, class, Scope::Class))
    }

    pub(crate) fn over_members(source: &'a S, class: ClassId, members: Arc<[ObjectRef]>) -> Self {
        Self::with_scope(source, class, Scope::Members(members))
    }

    fn with_scope(source: &'a S, class: ClassId, scope: Scope) -> Self {
        Self {
            source,
            class,
            scope,
            root: Frame::default(),
            groups: Vec::new(),
        }
    }

    /// Class the query selects from.
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// The tree built so far, ignoring open groups.
    pub fn predicate(&self) -> Option<&Predicate> {
        self.root.tree.as_ref()
    }

    fn current(&mut self) -> &mut Frame {
        match self.groups.last_mut() {
            Some(frame) => frame,
            None => &mut self.root,
        }
    }

    fn limits(&self) -> &QueryLimits {
        self.source.query_limits()
    }

    /// Resolves a possibly dotted field path, hop by hop.
    ///
    /// Each segment is looked up in the field table of the class the
    /// previous link points to, never in the query class's table.
    fn resolve(&self, path: &str) -> Result<FieldPath> {
        self.limits().validate_path(path)?;

        let schema = self.source.schema();
        let mut class = schema.class(self.class)?;
        let mut links = Vec::new();
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let field = class.field(segment)?;
            if segments.peek().is_none() {
                return Ok(FieldPath::new(links, field.clone()));
            }

            let target = match (field.field_type().is_link(), field.target()) {
                (true, Some(target)) => target,
                _ => {
                    return Err(Error::type_mismatch(
                        path,
                        format!("'{}' is a {} field, not a link", segment, field.field_type()),
                    ))
                }
            };
            links.push(field.clone());
            class = schema.class(target)?;
        }

        // validate_path rejects empty paths, so the loop always returns
        Err(Error::InvalidInput("Field name cannot be empty".to_string()))
    }

    fn add<F>(mut self, field: &str, build: F) -> Result<Self>
    where
        F: FnOnce(&FieldPath, &QueryLimits) -> Result<Operator>,
    {
        let outcome = self.resolve(field).and_then(|path| {
            let op = build(&path, self.limits())?;
            Ok(Comparison { path, op })
        });

        match outcome {
            Ok(comparison) => {
                self.current().append(Predicate::Comparison(comparison));
                Ok(self)
            }
            Err(err) => {
                debug!(class = %self.class, field, error = %err, "rejected predicate");
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    pub fn equal_to(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        self.add(field, |path, limits| {
            Ok(Operator::Eq(equality_operand(path, value, limits)?))
        })
    }

    /// String equality with an explicit case sensitivity.
    pub fn equal_to_case(self, field: &str, value: &str, case: Case) -> Result<Self> {
        self.add(field, |path, limits| {
            Ok(Operator::Eq(Operand::Text(text_operand(path, value, case, limits)?)))
        })
    }

    pub fn not_equal_to(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        self.add(field, |path, limits| {
            Ok(Operator::Ne(equality_operand(path, value, limits)?))
        })
    }

    /// String inequality with an explicit case sensitivity.
    pub fn not_equal_to_case(self, field: &str, value: &str, case: Case) -> Result<Self> {
        self.add(field, |path, limits| {
            Ok(Operator::Ne(Operand::Text(text_operand(path, value, case, limits)?)))
        })
    }

    pub fn greater_than(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        self.add(field, |path, _| {
            Ok(Operator::Gt(ordered_operand(path, value, "greater_than")?))
        })
    }

    pub fn greater_than_or_equal_to(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        self.add(field, |path, _| {
            Ok(Operator::Gte(ordered_operand(
                path,
                value,
                "greater_than_or_equal_to",
            )?))
        })
    }

    pub fn less_than(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        self.add(field, |path, _| {
            Ok(Operator::Lt(ordered_operand(path, value, "less_than")?))
        })
    }

    pub fn less_than_or_equal_to(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        self.add(field, |path, _| {
            Ok(Operator::Lte(ordered_operand(
                path,
                value,
                "less_than_or_equal_to",
            )?))
        })
    }

    /// Inclusive range: `low <= field <= high`.
    pub fn between(
        self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self> {
        let (low, high) = (low.into(), high.into());
        self.add(field, |path, _| {
            Ok(Operator::Between(
                ordered_operand(path, low, "between")?,
                ordered_operand(path, high, "between")?,
            ))
        })
    }

    // ------------------------------------------------------------------
    // String predicates
    // ------------------------------------------------------------------

    pub fn begins_with(self, field: &str, prefix: &str) -> Result<Self> {
        self.begins_with_case(field, prefix, Case::Sensitive)
    }

    pub fn begins_with_case(self, field: &str, prefix: &str, case: Case) -> Result<Self> {
        self.add(field, |path, limits| {
            Ok(Operator::BeginsWith(text_operand(path, prefix, case, limits)?))
        })
    }

    pub fn ends_with(self, field: &str, suffix: &str) -> Result<Self> {
        self.ends_with_case(field, suffix, Case::Sensitive)
    }

    pub fn ends_with_case(self, field: &str, suffix: &str, case: Case) -> Result<Self> {
        self.add(field, |path, limits| {
            Ok(Operator::EndsWith(text_operand(path, suffix, case, limits)?))
        })
    }

    pub fn contains(self, field: &str, substring: &str) -> Result<Self> {
        self.contains_case(field, substring, Case::Sensitive)
    }

    pub fn contains_case(self, field: &str, substring: &str, case: Case) -> Result<Self> {
        self.add(field, |path, limits| {
            Ok(Operator::Contains(text_operand(path, substring, case, limits)?))
        })
    }

    // ------------------------------------------------------------------
    // Null checks
    // ------------------------------------------------------------------

    /// Matches objects whose field (or link) is unset.
    pub fn is_null(self, field: &str) -> Result<Self> {
        self.add(field, |path, _| {
            nullable_leaf(path)?;
            Ok(Operator::Eq(Operand::Null))
        })
    }

    pub fn is_not_null(self, field: &str) -> Result<Self> {
        self.add(field, |path, _| {
            nullable_leaf(path)?;
            Ok(Operator::Ne(Operand::Null))
        })
    }

    // ------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------

    /// Combines the next predicate or group with OR instead of AND.
    pub fn or(mut self) -> Result<Self> {
        let frame = self.current();
        if frame.tree.is_none() {
            return Err(Error::InvalidOperation(
                "or() needs a predicate on its left-hand side".to_string(),
            ));
        }
        if frame.pending_or {
            return Err(Error::InvalidOperation("or() is already pending".to_string()));
        }
        if frame.negate_next {
            return Err(Error::InvalidOperation("or() cannot follow not()".to_string()));
        }
        frame.pending_or = true;
        Ok(self)
    }

    /// Explicit form of the implicit AND; chaining without it is equivalent.
    pub fn and(mut self) -> Result<Self> {
        let frame = self.current();
        if frame.tree.is_none() {
            return Err(Error::InvalidOperation(
                "and() needs a predicate on its left-hand side".to_string(),
            ));
        }
        if frame.pending_or {
            return Err(Error::InvalidOperation(
                "and() cannot follow a pending or()".to_string(),
            ));
        }
        Ok(self)
    }

    /// Negates the next predicate or group.
    pub fn not(mut self) -> Result<Self> {
        let frame = self.current();
        frame.negate_next = !frame.negate_next;
        Ok(self)
    }

    /// Opens a parenthesised group.
    pub fn begin_group(mut self) -> Result<Self> {
        self.limits().validate_group_depth(self.groups.len() + 1)?;
        self.groups.push(Frame::default());
        Ok(self)
    }

    /// Closes the innermost group and appends it like a single predicate.
    pub fn end_group(mut self) -> Result<Self> {
        let frame = self.groups.pop().ok_or_else(|| {
            Error::InvalidOperation("end_group() without matching begin_group()".to_string())
        })?;
        if let Some(problem) = frame.dangling() {
            return Err(Error::InvalidOperation(problem.to_string()));
        }
        let tree = frame
            .tree
            .ok_or_else(|| Error::InvalidOperation("empty group".to_string()))?;
        self.current().append(tree);
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------

    fn finished(&self) -> Result<Option<&Predicate>> {
        if !self.groups.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "{} group(s) not closed",
                self.groups.len()
            )));
        }
        if let Some(problem) = self.root.dangling() {
            return Err(Error::InvalidOperation(problem.to_string()));
        }
        Ok(self.root.tree.as_ref())
    }

    fn candidates(&self) -> Result<Candidates<'_>> {
        Ok(match &self.scope {
            Scope::Class => {
                Candidates::Class(self.class, self.source.object_keys(self.class)?.iter())
            }
            Scope::Members(members) => Candidates::Members(members.iter()),
        })
    }

    /// Evaluates the query and materialises every match in storage order
    /// (or in the parent result set's order for subqueries).
    pub fn find_all(&self) -> Result<Results<'a, S>> {
        let predicate = self.finished()?;
        let matched = Evaluator::new(self.source).filter(self.candidates()?, predicate)?;
        debug!(
            class = %self.class,
            predicate = %DisplayTree(predicate),
            matches = matched.len(),
            "find_all"
        );
        Ok(Results::new(self.source, self.class, matched))
    }

    /// Evaluates the query and sorts the matches by `field`.
    pub fn find_all_sorted(&self, field: &str, direction: OrderDirection) -> Result<Results<'a, S>> {
        self.find_all()?.sorted(field, direction)
    }

    /// First match in iteration order; stops scanning at the first hit.
    pub fn find_first(&self) -> Result<Option<ObjectRef>> {
        let predicate = self.finished()?;
        Evaluator::new(self.source).first(self.candidates()?, predicate)
    }

    /// Number of matches, without materialising them.
    pub fn count(&self) -> Result<usize> {
        let predicate = self.finished()?;
        Evaluator::new(self.source).count(self.candidates()?, predicate)
    }
}

enum Candidates<'s> {
    Class(ClassId, std::slice::Iter<'s, ObjectKey>),
    Members(std::slice::Iter<'s, ObjectRef>),
}

impl Iterator for Candidates<'_> {
    type Item = ObjectRef;

    fn next(&mut self) -> Option<ObjectRef> {
        match self {
            Candidates::Class(class, keys) => keys.next().map(|&key| ObjectRef::new(*class, key)),
            Candidates::Members(members) => members.next().copied(),
        }
    }
}

struct DisplayTree<'p>(Option<&'p Predicate>);

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(p) => write!(f, "{}", p),
            None => write!(f, "TRUEPREDICATE"),
        }
    }
}

// ----------------------------------------------------------------------
// Operand coercion
// ----------------------------------------------------------------------

fn mismatch(path: &FieldPath, message: String) -> Error {
    Error::type_mismatch(path.to_string(), message)
}

/// Coerces `value` to the leaf field's declared type.
fn coerce(path: &FieldPath, value: Value, limits: &QueryLimits) -> Result<Operand> {
    let leaf = path.leaf();
    let operand = match (leaf.field_type(), value) {
        (FieldType::Integer, Value::Integer(v)) => Operand::Integer(v),
        (FieldType::Float, Value::Integer(v)) => Operand::Float(v as f32),
        (FieldType::Float, Value::Float(v)) => Operand::Float(v),
        (FieldType::Float, Value::Double(v)) => Operand::Float(v as f32),
        (FieldType::Double, Value::Integer(v)) => Operand::Double(v as f64),
        (FieldType::Double, Value::Float(v)) => Operand::Double(v as f64),
        (FieldType::Double, Value::Double(v)) => Operand::Double(v),
        (FieldType::Boolean, Value::Boolean(v)) => Operand::Boolean(v),
        (FieldType::String, Value::String(v)) => {
            limits.validate_operand_len(v.len())?;
            Operand::Text(TextPattern::new(v, Case::Sensitive))
        }
        (FieldType::Binary, Value::Binary(v)) => {
            limits.validate_operand_len(v.len())?;
            Operand::Binary(v)
        }
        (FieldType::Date, Value::Date(v)) => Operand::Date(v),
        (field_type, value) => {
            return Err(mismatch(
                path,
                format!(
                    "a {} field cannot be compared with a {} value",
                    field_type,
                    value.type_name()
                ),
            ))
        }
    };
    Ok(operand)
}

fn scalar_leaf(path: &FieldPath) -> Result<&FieldDescriptor> {
    let leaf = path.leaf();
    if leaf.field_type().is_link() {
        return Err(mismatch(
            path,
            format!(
                "{} fields can only be traversed or null-checked",
                leaf.field_type()
            ),
        ));
    }
    Ok(leaf)
}

fn nullable_leaf(path: &FieldPath) -> Result<()> {
    let leaf = path.leaf();
    if !leaf.is_nullable() {
        return Err(mismatch(path, "field is not nullable".to_string()));
    }
    Ok(())
}

fn equality_operand(path: &FieldPath, value: Value, limits: &QueryLimits) -> Result<Operand> {
    if value.is_null() {
        nullable_leaf(path)?;
        return Ok(Operand::Null);
    }
    scalar_leaf(path)?;
    coerce(path, value, limits)
}

fn ordered_operand(path: &FieldPath, value: Value, op: &str) -> Result<Operand> {
    let leaf = scalar_leaf(path)?;
    if !leaf.field_type().is_orderable() {
        return Err(mismatch(
            path,
            format!("{} is not supported on {} fields", op, leaf.field_type()),
        ));
    }
    if value.is_null() {
        return Err(mismatch(path, format!("{} needs a non-null operand", op)));
    }
    // ordered types carry no string/binary payload, so limits never apply
    coerce(path, value, &QueryLimits::DEFAULT)
}

fn text_operand(path: &FieldPath, text: &str, case: Case, limits: &QueryLimits) -> Result<TextPattern> {
    let leaf = path.leaf();
    if leaf.field_type() != FieldType::String {
        return Err(mismatch(
            path,
            format!("string predicates need a string field, found {}", leaf.field_type()),
        ));
    }
    limits.validate_operand_len(text.len())?;
    Ok(TextPattern::new(text, case))
}
