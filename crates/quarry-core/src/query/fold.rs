//! Case folding for string predicates.
//!
//! Insensitive comparison folds both sides character by character with the
//! Unicode lowercase mapping, plus `ς → σ` so a word-final sigma matches its
//! medial form. Each character maps only to its own script's lowercase
//! partner: Latin `A` folds to `a`, Greek `Α` folds to `α`, and the two never
//! meet. Scripts without case (Hangul, CJK) pass through unchanged.
//!
//! Folding is comparison-only; stored data is never rewritten.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Case sensitivity of a string predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Case {
    /// Exact codepoint comparison
    #[default]
    Sensitive,
    /// Compare after Unicode case folding
    Insensitive,
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Case::Sensitive => Ok(()),
            Case::Insensitive => write!(f, "[c]"),
        }
    }
}

fn fold_char(c: char) -> impl Iterator<Item = char> {
    c.to_lowercase()
        .map(|lower| if lower == 'ς' { 'σ' } else { lower })
}

/// Folds a string for case-insensitive comparison.
pub fn fold(input: &str) -> Cow<'_, str> {
    if input.is_ascii() {
        if input.bytes().any(|b| b.is_ascii_uppercase()) {
            return Cow::Owned(input.to_ascii_lowercase());
        }
        return Cow::Borrowed(input);
    }

    Cow::Owned(input.chars().flat_map(fold_char).collect())
}

/// A string operand prepared for repeated matching
///
/// The folded form of the needle is computed once at construction; only
/// the stored side is folded per object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPattern {
    raw: String,
    folded: Option<String>,
}

impl TextPattern {
    pub fn new(raw: impl Into<String>, case: Case) -> Self {
        let raw = raw.into();
        let folded = match case {
            Case::Sensitive => None,
            Case::Insensitive => Some(fold(&raw).into_owned()),
        };
        Self { raw, folded }
    }

    /// The operand exactly as the caller gave it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn case(&self) -> Case {
        if self.folded.is_some() {
            Case::Insensitive
        } else {
            Case::Sensitive
        }
    }

    fn apply<F>(&self, haystack: &str, test: F) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        match &self.folded {
            None => test(haystack, &self.raw),
            Some(needle) => test(&*fold(haystack), needle),
        }
    }

    pub fn equals(&self, haystack: &str) -> bool {
        self.apply(haystack, |h, n| h == n)
    }

    pub fn begins(&self, haystack: &str) -> bool {
        self.apply(haystack, |h, n| h.starts_with(n))
    }

    pub fn ends(&self, haystack: &str) -> bool {
        self.apply(haystack, |h, n| h.ends_with(n))
    }

    pub fn contained_in(&self, haystack: &str) -> bool {
        self.apply(haystack, |h, n| h.contains(n))
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'{}", self.raw, self.case())
    }
}
