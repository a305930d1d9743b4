//! Error types for Quarry.

use std::fmt;

/// The main error type for Quarry operations.
#[derive(Debug)]
pub enum Error {
    /// A lock was poisoned (internal error)
    LockPoisoned,

    /// I/O error
    Io(std::io::Error),

    /// Serialization/deserialization error
    Serialization(String),

    /// Storage layer error
    Storage(String),

    /// Persisted data failed validation
    Corruption(String),

    /// A field name is absent from the class it was resolved against
    InvalidField {
        /// Class the lookup was made in
        class: String,
        /// Field name as given by the caller
        field: String,
    },

    /// An operand or operator does not fit the field's declared type
    TypeMismatch {
        /// Field (or field path) the predicate targets
        field: String,
        /// What was wrong
        message: String,
    },

    /// No class with this name in the schema
    UnknownClass(String),

    /// A field resolved under one class was applied to an object of another
    ClassMismatch {
        /// Class that owns the field descriptor
        expected: String,
        /// Class of the object being read
        found: String,
    },

    /// Invalid operation (builder misuse, unbalanced groups)
    InvalidOperation(String),

    /// Input rejected by validation limits
    InvalidInput(String),

    /// Not found
    NotFound,
}

impl Error {
    /// Returns true for errors the caller caused by passing a bad argument.
    ///
    /// These are raised synchronously while a query is being built and are
    /// never turned into an empty result.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::InvalidField { .. }
                | Error::TypeMismatch { .. }
                | Error::UnknownClass(_)
                | Error::InvalidOperation(_)
                | Error::InvalidInput(_)
        )
    }

    pub(crate) fn type_mismatch(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TypeMismatch {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LockPoisoned => write!(f, "Lock poisoned"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Corruption(msg) => write!(f, "Data corruption: {}", msg),
            Error::InvalidField { class, field } => {
                write!(f, "Field '{}' does not exist in class '{}'", field, class)
            }
            Error::TypeMismatch { field, message } => {
                write!(f, "Type mismatch on field '{}': {}", field, message)
            }
            Error::UnknownClass(name) => write!(f, "Class '{}' is not part of the schema", name),
            Error::ClassMismatch { expected, found } => write!(
                f,
                "Field of class '{}' applied to an object of class '{}'",
                expected, found
            ),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::NotFound => write!(f, "Not found"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A specialized `Result` type for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
