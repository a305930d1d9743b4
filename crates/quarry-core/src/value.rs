//! Field types and values.
//!
//! [`Value`] is the owned form used when writing objects and passing
//! operands; [`ValueRef`] is the borrowed form the storage layer hands to
//! the evaluator so string and binary columns are never copied during a scan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// 64-bit signed integer
    Integer,
    /// IEEE single precision
    Float,
    /// IEEE double precision
    Double,
    Boolean,
    /// UTF-8 string
    String,
    Binary,
    /// Point in time, millisecond resolution
    Date,
    /// Reference to at most one object of the target class
    Link,
    /// Ordered references to objects of the target class
    LinkList,
}

impl FieldType {
    /// Whether ordering operators (`<`, `between`, ...) apply to this type.
    pub fn is_orderable(self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Float | FieldType::Double | FieldType::Date
        )
    }

    /// Whether the field refers to other objects.
    pub fn is_link(self) -> bool {
        matches!(self, FieldType::Link | FieldType::LinkList)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::String => "string",
            FieldType::Binary => "binary",
            FieldType::Date => "date",
            FieldType::Link => "link",
            FieldType::LinkList => "link list",
        };
        f.write_str(name)
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The Unix epoch
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from milliseconds since the epoch.
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Milliseconds since the epoch.
    pub const fn as_millis(self) -> i64 {
        self.0
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Timestamp(after.as_millis() as i64),
            Err(before) => Timestamp(-(before.duration().as_millis() as i64)),
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> Self {
        if ts.0 >= 0 {
            UNIX_EPOCH + Duration::from_millis(ts.0 as u64)
        } else {
            UNIX_EPOCH - Duration::from_millis(ts.0.unsigned_abs())
        }
    }
}

/// Stable identity of an object within its class.
///
/// Keys are never reused by a store, so a key stays valid as a reference
/// even after other objects are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey(pub u64);

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owned field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Binary(Vec<u8>),
    Date(Timestamp),
    Link(ObjectKey),
    LinkList(Vec<ObjectKey>),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Date(_) => "date",
            Value::Link(_) => "link",
            Value::LinkList(_) => "link list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow this value.
    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Null => ValueRef::Null,
            Value::Integer(v) => ValueRef::Integer(*v),
            Value::Float(v) => ValueRef::Float(*v),
            Value::Double(v) => ValueRef::Double(*v),
            Value::Boolean(v) => ValueRef::Boolean(*v),
            Value::String(v) => ValueRef::String(v),
            Value::Binary(v) => ValueRef::Binary(v),
            Value::Date(v) => ValueRef::Date(*v),
            Value::Link(v) => ValueRef::Link(*v),
            Value::LinkList(v) => ValueRef::LinkList(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_value_ref().fmt(f)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Date(v)
    }
}

impl From<SystemTime> for Value {
    fn from(v: SystemTime) -> Self {
        Value::Date(v.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Borrowed field value as read from a column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    Null,
    Integer(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(&'a str),
    Binary(&'a [u8]),
    Date(Timestamp),
    Link(ObjectKey),
    LinkList(&'a [ObjectKey]),
}

impl ValueRef<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, ValueRef::Null)
    }

    /// Copy into an owned [`Value`].
    pub fn to_value(&self) -> Value {
        match *self {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Float(v) => Value::Float(v),
            ValueRef::Double(v) => Value::Double(v),
            ValueRef::Boolean(v) => Value::Boolean(v),
            ValueRef::String(v) => Value::String(v.to_string()),
            ValueRef::Binary(v) => Value::Binary(v.to_vec()),
            ValueRef::Date(v) => Value::Date(v),
            ValueRef::Link(v) => Value::Link(v),
            ValueRef::LinkList(v) => Value::LinkList(v.to_vec()),
        }
    }
}

impl fmt::Display for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Null => write!(f, "NULL"),
            ValueRef::Integer(v) => write!(f, "{}", v),
            ValueRef::Float(v) => write!(f, "{}f", v),
            ValueRef::Double(v) => write!(f, "{}", v),
            ValueRef::Boolean(v) => write!(f, "{}", v),
            ValueRef::String(v) => write!(f, "'{}'", v),
            ValueRef::Binary(v) => write!(f, "<{} bytes>", v.len()),
            ValueRef::Date(v) => write!(f, "@{}", v.as_millis()),
            ValueRef::Link(v) => write!(f, "{}", v),
            ValueRef::LinkList(v) => write!(f, "[{} links]", v.len()),
        }
    }
}
