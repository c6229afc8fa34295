use std::fmt;

use serde::Serialize;

use crate::model::RecordRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Fetch,
    Parse,
    Schema,
    Semantic,
    Duplicate,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Fetch => "fetch",
            FindingKind::Parse => "parse",
            FindingKind::Schema => "schema",
            FindingKind::Semantic => "semantic",
            FindingKind::Duplicate => "duplicate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    FetchFailed,
    InvalidYaml,
    NonYamlFile,
    MissingField,
    WrongType,
    ExtraProperty,
    MalformedUri,
    MaxDepthExceeded,
    SchemaViolation,
    DomainMismatch,
    MissingHost,
    DuplicateUrl,
}

impl Rule {
    pub fn kind(&self) -> FindingKind {
        match self {
            Rule::FetchFailed => FindingKind::Fetch,
            Rule::InvalidYaml | Rule::NonYamlFile => FindingKind::Parse,
            Rule::MissingField
            | Rule::WrongType
            | Rule::ExtraProperty
            | Rule::MalformedUri
            | Rule::MaxDepthExceeded
            | Rule::SchemaViolation => FindingKind::Schema,
            Rule::DomainMismatch | Rule::MissingHost => FindingKind::Semantic,
            Rule::DuplicateUrl => FindingKind::Duplicate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::FetchFailed => "fetch_failed",
            Rule::InvalidYaml => "invalid_yaml",
            Rule::NonYamlFile => "non_yaml_file",
            Rule::MissingField => "missing_field",
            Rule::WrongType => "wrong_type",
            Rule::ExtraProperty => "extra_property",
            Rule::MalformedUri => "malformed_uri",
            Rule::MaxDepthExceeded => "max_depth_exceeded",
            Rule::SchemaViolation => "schema_violation",
            Rule::DomainMismatch => "domain_mismatch",
            Rule::MissingHost => "missing_host",
            Rule::DuplicateUrl => "duplicate_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub rule: Rule,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub occurrences: Vec<RecordRef>,
}

impl Finding {
    pub fn project(rule: Rule, project: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: rule.kind(),
            rule,
            project: project.into(),
            record: None,
            path: None,
            message: message.into(),
            occurrences: Vec::new(),
        }
    }

    pub fn record(
        rule: Rule,
        record: RecordRef,
        path: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: rule.kind(),
            rule,
            project: record.project.clone(),
            record: Some(record),
            path,
            message: message.into(),
            occurrences: Vec::new(),
        }
    }

    pub fn duplicate(url: &str, occurrences: Vec<RecordRef>) -> Self {
        let project = occurrences
            .first()
            .map(|first| first.project.clone())
            .unwrap_or_default();
        let message = format!(
            "url {url} is registered {} times",
            occurrences.len()
        );
        Self {
            kind: FindingKind::Duplicate,
            rule: Rule::DuplicateUrl,
            project,
            record: None,
            path: None,
            message,
            occurrences,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.kind.as_str(), self.rule.as_str())?;
        if let Some(record) = &self.record {
            write!(f, " {record}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " at {path}")?;
        }
        write!(f, ": {}", self.message)?;
        if !self.occurrences.is_empty() {
            let listed = self
                .occurrences
                .iter()
                .map(|occurrence| occurrence.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ({listed})")?;
        }
        Ok(())
    }
}
