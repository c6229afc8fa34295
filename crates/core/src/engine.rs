use rayon::prelude::*;
use tracing::debug;

use crate::duplicates::find_duplicates;
use crate::finding::{Finding, Rule};
use crate::model::{ProjectBookmarkSet, RawRecord};
use crate::parser::parse_project;
use crate::report::{ProjectStatus, ProjectSummary, Report};
use crate::schema::SchemaValidator;
use crate::semantic;

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectInput {
    Content {
        project: String,
        content: Vec<u8>,
        local: bool,
    },
    Absent {
        project: String,
    },
    Failed {
        project: String,
        error: String,
    },
    // A repository file that is neither hidden nor YAML.
    Foreign {
        project: String,
    },
}

#[derive(Debug)]
pub struct ProjectOutcome {
    pub summary: ProjectSummary,
    pub records: Vec<RawRecord>,
    pub findings: Vec<Finding>,
}

pub fn validate_records(validator: &SchemaValidator, records: &[RawRecord]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for record in records {
        let schema_findings = validator.validate(record);
        if schema_findings.is_empty() {
            findings.extend(semantic::check_record(record));
        } else {
            findings.extend(schema_findings);
        }
    }
    findings
}

pub fn validate_project(validator: &SchemaValidator, input: ProjectInput) -> ProjectOutcome {
    let (status, parsed) = match input {
        ProjectInput::Content {
            project,
            content,
            local,
        } => {
            let status = if local {
                ProjectStatus::Local
            } else {
                ProjectStatus::Fetched
            };
            let parsed = parse_project(&project, &content).map_err(|err| {
                Finding::project(Rule::InvalidYaml, project.clone(), err.to_string())
            });
            (status, parsed.map_err(|finding| (project, finding)))
        }
        ProjectInput::Absent { project } => {
            (ProjectStatus::Absent, Ok(ProjectBookmarkSet::empty(project)))
        }
        ProjectInput::Failed { project, error } => {
            let finding = Finding::project(Rule::FetchFailed, project.clone(), error);
            (ProjectStatus::Failed, Err((project, finding)))
        }
        ProjectInput::Foreign { project } => {
            let finding = Finding::project(
                Rule::NonYamlFile,
                project.clone(),
                "only .yml and .yaml files may be committed to a bookmark repository",
            );
            (ProjectStatus::Rejected, Err((project, finding)))
        }
    };
    match parsed {
        Ok(set) => {
            let findings = validate_records(validator, &set.records);
            debug!(
                project = %set.project,
                records = set.records.len(),
                findings = findings.len(),
                "validated project"
            );
            ProjectOutcome {
                summary: ProjectSummary {
                    project: set.project,
                    status,
                    records: set.records.len(),
                },
                records: set.records,
                findings,
            }
        }
        Err((project, finding)) => ProjectOutcome {
            summary: ProjectSummary {
                project,
                status,
                records: 0,
            },
            records: Vec::new(),
            findings: vec![finding],
        },
    }
}

pub fn validate_group(validator: &SchemaValidator, inputs: Vec<ProjectInput>) -> Report {
    let mut outcomes: Vec<ProjectOutcome> = inputs
        .into_par_iter()
        .map(|input| validate_project(validator, input))
        .collect();
    // Duplicate detection needs every project, so it runs after the parallel pass.
    outcomes.sort_by(|a, b| a.summary.project.cmp(&b.summary.project));
    let duplicates = find_duplicates(outcomes.iter().flat_map(|o| o.records.iter()));
    let mut summaries = Vec::with_capacity(outcomes.len());
    let mut findings = Vec::new();
    for outcome in outcomes {
        summaries.push(outcome.summary);
        findings.extend(outcome.findings);
    }
    findings.extend(duplicates);
    Report::assemble(summaries, findings)
}
