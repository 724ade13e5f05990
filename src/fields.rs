//! Helpers for walking a parsed generic document.

use serde_json::{Map, Value};

use crate::error::{ErrorKind, FieldError, ValidationErrors};

/// Collects every violation found during one validation pass.
#[derive(Debug, Default)]
pub(crate) struct Report {
    errors: Vec<FieldError>,
}

impl Report {
    pub fn push(&mut self, path: String, kind: ErrorKind) {
        self.errors.push(FieldError { path, kind });
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The validated document, or the full set of violations. Atomic: a
    /// document with any violation is never returned.
    pub fn finish<T>(self, document: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(document)
        } else {
            Err(ValidationErrors::new(self.errors))
        }
    }
}

/// Appends a named field to a document path.
pub(crate) fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Appends a list index to a document path.
pub(crate) fn element(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Tracks which keys of an object the schema has claimed, so the leftovers
/// can be rejected as unknown fields.
pub(crate) struct Fields<'a> {
    map: &'a Map<String, Value>,
    taken: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            taken: Vec::new(),
        }
    }

    pub fn take(&mut self, key: &'static str) -> Option<&'a Value> {
        let value = self.map.get(key);
        if value.is_some() {
            self.taken.push(key);
        }
        value
    }

    pub fn deny_unknown(self, path: &str, report: &mut Report) {
        for key in self.map.keys() {
            if !self.taken.contains(&key.as_str()) {
                report.push(child(path, key), ErrorKind::UnknownField);
            }
        }
    }
}

pub(crate) fn object<'a>(
    value: &'a Value,
    path: &str,
    report: &mut Report,
) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => {
            report.push(path.to_string(), ErrorKind::TypeMismatch { expected: "object" });
            None
        }
    }
}

pub(crate) fn array<'a>(value: &'a Value, path: &str, report: &mut Report) -> Option<&'a [Value]> {
    match value {
        Value::Array(items) => Some(items),
        _ => {
            report.push(path.to_string(), ErrorKind::TypeMismatch { expected: "list" });
            None
        }
    }
}

/// Strings are whitespace-trimmed before any further validation.
pub(crate) fn string(value: &Value, path: &str, report: &mut Report) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        _ => {
            report.push(path.to_string(), ErrorKind::TypeMismatch { expected: "string" });
            None
        }
    }
}

pub(crate) fn boolean(value: &Value, path: &str, report: &mut Report) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        _ => {
            report.push(path.to_string(), ErrorKind::TypeMismatch { expected: "boolean" });
            None
        }
    }
}

pub(crate) fn integer(value: &Value, path: &str, report: &mut Report) -> Option<i64> {
    match value.as_i64() {
        Some(n) => Some(n),
        None => {
            report.push(path.to_string(), ErrorKind::TypeMismatch { expected: "integer" });
            None
        }
    }
}
