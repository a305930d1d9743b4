//! Predicate tree.
//!
//! A tagged variant over comparisons and boolean combinators. Nodes are
//! immutable once built; the builder only ever wraps an existing tree in a
//! new root.

use super::fold::TextPattern;
use crate::schema::FieldDescriptor;
use crate::value::Timestamp;
use std::fmt;

/// Resolved field reference, possibly reached through links
///
/// `links` holds the link hops in traversal order, each resolved against
/// the class the previous hop points to; `leaf` is resolved against the
/// class of the last hop (or the query class when there are no hops).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    links: Vec<FieldDescriptor>,
    leaf: FieldDescriptor,
}

impl FieldPath {
    pub(crate) fn new(links: Vec<FieldDescriptor>, leaf: FieldDescriptor) -> Self {
        Self { links, leaf }
    }

    pub fn links(&self) -> &[FieldDescriptor] {
        &self.links
    }

    pub fn leaf(&self) -> &FieldDescriptor {
        &self.leaf
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for link in &self.links {
            write!(f, "{}.", link.name())?;
        }
        write!(f, "{}", self.leaf.name())
    }
}

/// Comparison operand, already coerced to the field's declared type
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Integer(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Binary(Vec<u8>),
    Date(Timestamp),
    Text(TextPattern),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Null => write!(f, "NULL"),
            Operand::Integer(v) => write!(f, "{}", v),
            Operand::Float(v) => write!(f, "{}f", v),
            Operand::Double(v) => write!(f, "{}", v),
            Operand::Boolean(v) => write!(f, "{}", v),
            Operand::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Operand::Date(v) => write!(f, "@{}", v.as_millis()),
            Operand::Text(p) => write!(f, "{}", p),
        }
    }
}

/// Comparison operator with its operands
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Operand),
    Ne(Operand),
    Lt(Operand),
    Lte(Operand),
    Gt(Operand),
    Gte(Operand),
    /// Inclusive on both ends
    Between(Operand, Operand),
    BeginsWith(TextPattern),
    EndsWith(TextPattern),
    Contains(TextPattern),
}

/// Single field comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub path: FieldPath,
    pub op: Operator,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Operator::Eq(v) => write!(f, "{} = {}", self.path, v),
            Operator::Ne(v) => write!(f, "{} != {}", self.path, v),
            Operator::Lt(v) => write!(f, "{} < {}", self.path, v),
            Operator::Lte(v) => write!(f, "{} <= {}", self.path, v),
            Operator::Gt(v) => write!(f, "{} > {}", self.path, v),
            Operator::Gte(v) => write!(f, "{} >= {}", self.path, v),
            Operator::Between(lo, hi) => write!(f, "{} BETWEEN {} AND {}", self.path, lo, hi),
            Operator::BeginsWith(p) => write!(f, "{} BEGINSWITH {}", self.path, p),
            Operator::EndsWith(p) => write!(f, "{} ENDSWITH {}", self.path, p),
            Operator::Contains(p) => write!(f, "{} CONTAINS {}", self.path, p),
        }
    }
}

/// Predicate tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(Comparison),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Comparison(c) => write!(f, "{}", c),
            Predicate::And(l, r) => write!(f, "({} AND {})", l, r),
            Predicate::Or(l, r) => write!(f, "({} OR {})", l, r),
            Predicate::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}
