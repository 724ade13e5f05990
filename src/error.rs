//! Error surface of the validation engine.
//!
//! A validation pass never stops at the first problem: every independent
//! violation is collected as a [`FieldError`] and the whole set is returned
//! as one [`ValidationErrors`] value, so a caller can report the complete
//! state of a bad document in one round.

use std::fmt;

use thiserror::Error;

/// The constraint a single field violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A constrained string failed its pattern after normalization.
    #[error("value {value:?} does not match pattern {pattern}")]
    PatternMismatch {
        pattern: &'static str,
        value: String,
    },
    /// A value outside a closed enumeration.
    #[error("unknown value {value:?}, expected one of {allowed:?}")]
    EnumMismatch {
        value: String,
        allowed: &'static [&'static str],
    },
    /// A field with no default was absent from the input.
    #[error("required field is missing")]
    RequiredFieldMissing,
    /// The input carried a field the schema does not declare.
    #[error("unknown field")]
    UnknownField,
    /// The input's shape does not match any expected form.
    #[error("expected {expected}")]
    TypeMismatch { expected: &'static str },
}

/// One violation, tagged with the document path it occurred at
/// (`rancher.state.boot_dev`, `write_files[0].permissions`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub kind: ErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "document: {}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Every violation found in one validation pass over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Failures surfaced by the textual entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The input bytes are not well-formed YAML or JSON.
    #[error("malformed document: {0}")]
    Parse(String),
    /// The document parsed but violated the schema.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// Canonical serialization failed.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
