use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookmarkRecord {
    pub name: String,
    pub url: String,
    pub domain: String,
    pub category: String,
    pub packages: Vec<PackageNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageNode {
    pub key: String,
    #[serde(default)]
    pub children: Vec<PackageNode>,
}

// A record exactly as decoded from YAML, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub project: String,
    pub index: usize,
    pub value: Value,
}

impl RawRecord {
    pub fn new(project: impl Into<String>, index: usize, value: Value) -> Self {
        Self {
            project: project.into(),
            index,
            value,
        }
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.value.get(field).and_then(Value::as_str)
    }

    pub fn reference(&self) -> RecordRef {
        RecordRef {
            project: self.project.clone(),
            index: self.index,
            name: self.str_field("name").map(str::to_string),
            url: self.str_field("url").map(str::to_string),
        }
    }

    pub fn to_typed(&self) -> Option<BookmarkRecord> {
        BookmarkRecord::deserialize(&self.value).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRef {
    pub project: String,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.project, self.index)?;
        if let Some(name) = &self.name {
            write!(f, " ({name:?})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBookmarkSet {
    pub project: String,
    pub records: Vec<RawRecord>,
}

impl ProjectBookmarkSet {
    pub fn empty(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            records: Vec::new(),
        }
    }
}
