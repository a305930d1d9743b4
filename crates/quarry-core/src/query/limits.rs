//! Query construction limits
//!
//! Input validation for the builder, so a hostile or buggy caller cannot
//! build unbounded trees or paths.

use crate::error::{Error, Result};

/// Bounds applied while a query is being built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum number of link hops in a dotted field path
    pub max_path_depth: usize,
    /// Maximum nesting of `begin_group` calls
    pub max_group_depth: usize,
    /// Maximum byte length of a string or binary operand
    pub max_operand_len: usize,
}

impl QueryLimits {
    /// Defaults used when a source does not configure its own limits
    pub const DEFAULT: QueryLimits = QueryLimits {
        max_path_depth: 8,
        max_group_depth: 64,
        max_operand_len: 1024 * 1024, // 1 MB
    };

    /// Validates a dotted field path before it is resolved.
    ///
    /// # Errors
    ///
    /// Returns Error::InvalidInput for empty paths, empty segments and paths
    /// with more link hops than allowed.
    #[inline]
    pub fn validate_path(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(Error::InvalidInput("Field name cannot be empty".to_string()));
        }

        if path.contains('\0') {
            return Err(Error::InvalidInput(
                "Field name cannot contain null bytes".to_string(),
            ));
        }

        let hops = path.split('.').count() - 1;
        if hops > self.max_path_depth {
            return Err(Error::InvalidInput(format!(
                "Field path '{}' has {} link hops, maximum is {}",
                path, hops, self.max_path_depth
            )));
        }

        if path.split('.').any(str::is_empty) {
            return Err(Error::InvalidInput(format!(
                "Field path '{}' contains an empty segment",
                path
            )));
        }

        Ok(())
    }

    /// Validates the byte length of a string or binary operand.
    #[inline]
    pub fn validate_operand_len(&self, len: usize) -> Result<()> {
        if len > self.max_operand_len {
            return Err(Error::InvalidInput(format!(
                "Operand length {} exceeds maximum {}",
                len, self.max_operand_len
            )));
        }
        Ok(())
    }

    /// Validates group nesting before a new group is opened.
    #[inline]
    pub fn validate_group_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_group_depth {
            return Err(Error::InvalidInput(format!(
                "Group nesting {} exceeds maximum {}",
                depth, self.max_group_depth
            )));
        }
        Ok(())
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}
