use std::collections::HashMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::finding::Finding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Fetched,
    Local,
    Absent,
    Failed,
    Rejected,
    Unlisted,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Fetched => "fetched",
            ProjectStatus::Local => "local",
            ProjectStatus::Absent => "absent",
            ProjectStatus::Failed => "failed",
            ProjectStatus::Rejected => "rejected",
            ProjectStatus::Unlisted => "unlisted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project: String,
    pub status: ProjectStatus,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub projects: Vec<ProjectSummary>,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn assemble(mut projects: Vec<ProjectSummary>, mut findings: Vec<Finding>) -> Self {
        for finding in &findings {
            if !projects.iter().any(|p| p.project == finding.project) {
                projects.push(ProjectSummary {
                    project: finding.project.clone(),
                    status: ProjectStatus::Unlisted,
                    records: 0,
                });
            }
        }
        projects.sort_by(|a, b| a.project.cmp(&b.project));
        let rank: HashMap<&str, usize> = projects
            .iter()
            .enumerate()
            .map(|(idx, summary)| (summary.project.as_str(), idx))
            .collect();
        // sort_by_key is stable, so first-seen order survives inside each group.
        findings.sort_by_key(|finding| (rank[finding.project.as_str()], finding.kind));
        Self { projects, findings }
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.projects.iter().map(|p| p.records).sum()
    }

    pub fn failed_projects(&self) -> usize {
        self.projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Failed)
            .count()
    }

    pub fn findings_for<'a>(&'a self, project: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.project == project)
    }

    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "bookmark validation: {} project(s), {} record(s), {} finding(s)",
            self.projects.len(),
            self.record_count(),
            self.findings.len()
        )?;
        for summary in &self.projects {
            let findings: Vec<&Finding> = self.findings_for(&summary.project).collect();
            let verdict = if findings.is_empty() { "ok" } else { "FAILED" };
            writeln!(out)?;
            writeln!(
                out,
                "{} [{}, {} record(s)] {}",
                summary.project,
                summary.status.as_str(),
                summary.records,
                verdict
            )?;
            for finding in findings {
                writeln!(out, "  {finding}")?;
            }
        }
        writeln!(out)?;
        if self.is_clean() {
            writeln!(out, "result: passed")?;
        } else {
            writeln!(
                out,
                "result: FAILED ({} finding(s), {} project(s) could not be verified)",
                self.findings.len(),
                self.failed_projects()
            )?;
        }
        Ok(())
    }

    pub fn write_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}
