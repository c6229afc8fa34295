use serde_json::Value;

use crate::error::{BookmarkError, Result};
use crate::model::{ProjectBookmarkSet, RawRecord};

pub fn parse_project(project: &str, content: &[u8]) -> Result<ProjectBookmarkSet> {
    let records = parse_records(project, content)?;
    Ok(ProjectBookmarkSet {
        project: project.to_string(),
        records,
    })
}

pub fn parse_records(project: &str, content: &[u8]) -> Result<Vec<RawRecord>> {
    if is_blank(content) {
        return Ok(Vec::new());
    }
    let document: Value = serde_yaml::from_slice(content)?;
    match document {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(idx, value)| RawRecord::new(project, idx + 1, value))
            .collect()),
        other => Err(BookmarkError::NotASequence(value_kind(&other))),
    }
}

fn is_blank(content: &[u8]) -> bool {
    String::from_utf8_lossy(content)
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
