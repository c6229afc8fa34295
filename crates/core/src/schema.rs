use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde_json::Value;

use crate::error::{BookmarkError, Result};
use crate::finding::{Finding, Rule};
use crate::model::{RawRecord, RecordRef};

pub const BOOKMARK_SCHEMA: &str = include_str!("../schema/bookmark.schema.json");
pub const MAX_PACKAGE_DEPTH: usize = 32;

pub struct SchemaValidator {
    validator: Validator,
    max_depth: usize,
}

impl SchemaValidator {
    pub fn bundled() -> Result<Self> {
        let schema: Value = serde_json::from_str(BOOKMARK_SCHEMA)
            .map_err(|e| BookmarkError::Schema(format!("bundled schema is not json: {e}")))?;
        Self::from_schema(&schema)
    }

    pub fn from_schema(schema: &Value) -> Result<Self> {
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| BookmarkError::Schema(e.to_string()))?;
        Ok(Self {
            validator,
            max_depth: MAX_PACKAGE_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn validate(&self, record: &RawRecord) -> Vec<Finding> {
        let reference = record.reference();
        let mut findings: Vec<Finding> = self
            .validator
            .iter_errors(&record.value)
            .map(|error| schema_finding(&reference, &error))
            .collect();
        if let Some(path) = first_node_beyond(&record.value, self.max_depth) {
            findings.push(Finding::record(
                Rule::MaxDepthExceeded,
                reference,
                Some(path),
                format!("package tree is nested deeper than {} levels", self.max_depth),
            ));
        }
        findings
    }
}

fn schema_finding(record: &RecordRef, error: &ValidationError<'_>) -> Finding {
    let rule = match &error.kind {
        ValidationErrorKind::Required { .. } => Rule::MissingField,
        ValidationErrorKind::AdditionalProperties { .. } => Rule::ExtraProperty,
        ValidationErrorKind::Type { .. } => Rule::WrongType,
        ValidationErrorKind::Format { .. } => Rule::MalformedUri,
        _ => Rule::SchemaViolation,
    };
    let pointer = error.instance_path.to_string();
    let path = if pointer.is_empty() || pointer == "/" {
        None
    } else {
        Some(pointer)
    };
    Finding::record(rule, record.clone(), path, error.to_string())
}

// Iterative walk; returns the JSON pointer of the first node deeper than `max_depth`.
fn first_node_beyond(record: &Value, max_depth: usize) -> Option<String> {
    let roots = record.get("packages")?.as_array()?;
    let mut stack: Vec<(&Value, String, usize)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(idx, node)| (node, format!("/packages/{idx}"), 1))
        .collect();
    while let Some((node, path, depth)) = stack.pop() {
        if depth > max_depth {
            return Some(path);
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            for (idx, child) in children.iter().enumerate().rev() {
                stack.push((child, format!("{path}/children/{idx}"), depth + 1));
            }
        }
    }
    None
}
