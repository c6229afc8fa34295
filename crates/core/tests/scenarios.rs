use bookmark_core::{
    validate_group, FindingKind, ProjectInput, ProjectStatus, Rule, SchemaValidator,
};

fn fetched(project: &str, yaml: &str) -> ProjectInput {
    ProjectInput::Content {
        project: project.to_string(),
        content: yaml.as_bytes().to_vec(),
        local: false,
    }
}

const GOOGLE: &str = r#"
- name: Google
  url: https://www.google.com
  domain: www.google.com
  category: Search/Engine
  packages: []
"#;

#[test]
fn valid_record_produces_no_findings() {
    let validator = SchemaValidator::bundled().unwrap();
    let report = validate_group(&validator, vec![fetched("group/a", GOOGLE)]);
    assert!(report.is_clean(), "{:?}", report.findings);
    assert_eq!(report.record_count(), 1);
}

#[test]
fn domain_mismatch_is_one_semantic_finding() {
    let validator = SchemaValidator::bundled().unwrap();
    let yaml = GOOGLE.replace("domain: www.google.com", "domain: google.com");
    let report = validate_group(&validator, vec![fetched("group/a", &yaml)]);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].kind, FindingKind::Semantic);
    assert_eq!(report.findings[0].rule, Rule::DomainMismatch);
}

#[test]
fn each_missing_required_field_is_reported_once() {
    let validator = SchemaValidator::bundled().unwrap();
    let fields = [
        ("name", "Google"),
        ("url", "https://www.google.com"),
        ("domain", "www.google.com"),
        ("category", "Search/Engine"),
        ("packages", "[]"),
    ];
    for (field, _) in fields {
        let body = fields
            .iter()
            .filter(|(name, _)| *name != field)
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n  ");
        let yaml = format!("- {body}\n");
        let report = validate_group(&validator, vec![fetched("group/a", &yaml)]);
        assert_eq!(report.findings.len(), 1, "field {field}: {:?}", report.findings);
        assert_eq!(report.findings[0].rule, Rule::MissingField);
        assert!(report.findings[0].message.contains(field));
    }
}

#[test]
fn cross_project_duplicate_names_both_projects() {
    let validator = SchemaValidator::bundled().unwrap();
    let a = "- name: A\n  url: https://x.com/a\n  domain: x.com\n  category: c\n  packages: []\n";
    let b = "- name: B\n  url: https://x.com/a\n  domain: x.com\n  category: c\n  packages: []\n";
    let report = validate_group(&validator, vec![fetched("B", b), fetched("A", a)]);
    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.rule, Rule::DuplicateUrl);
    let projects: Vec<&str> = finding.occurrences.iter().map(|o| o.project.as_str()).collect();
    assert_eq!(projects, vec!["A", "B"]);
}

#[test]
fn absent_bookmark_file_contributes_nothing() {
    let validator = SchemaValidator::bundled().unwrap();
    let report = validate_group(
        &validator,
        vec![
            fetched("group/a", GOOGLE),
            ProjectInput::Absent {
                project: "group/empty".to_string(),
            },
        ],
    );
    assert!(report.is_clean());
    assert_eq!(report.projects[1].status, ProjectStatus::Absent);
    assert_eq!(report.projects[1].records, 0);
}

#[test]
fn fetch_failure_fails_run_but_others_are_validated() {
    let validator = SchemaValidator::bundled().unwrap();
    let broken = GOOGLE.replace("  category: Search/Engine\n", "");
    assert!(!broken.contains("category"));
    let report = validate_group(
        &validator,
        vec![
            ProjectInput::Failed {
                project: "group/down".to_string(),
                error: "status 503".to_string(),
            },
            fetched("group/a", &broken),
        ],
    );
    assert!(!report.is_clean());
    assert_eq!(report.failed_projects(), 1);
    let kinds: Vec<FindingKind> = report.findings.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FindingKind::Schema, FindingKind::Fetch]);
    assert_eq!(report.findings[0].rule, Rule::MissingField);
    assert!(report.findings[0].message.contains("category"));
}

#[test]
fn non_yaml_file_fails_the_run_beside_valid_files() {
    let validator = SchemaValidator::bundled().unwrap();
    let report = validate_group(
        &validator,
        vec![
            fetched("group/a/bookmarks.yml", GOOGLE),
            ProjectInput::Foreign {
                project: "group/a/notes.txt".to_string(),
            },
        ],
    );
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].rule, Rule::NonYamlFile);
    assert_eq!(report.findings[0].project, "group/a/notes.txt");
    assert_eq!(report.projects[1].status, ProjectStatus::Rejected);
    assert_eq!(report.record_count(), 1);
}

#[test]
fn duplicate_check_includes_schema_invalid_records() {
    let validator = SchemaValidator::bundled().unwrap();
    let yaml = "- url: https://x.com/a\n- url: https://x.com/a\n  extra: true\n";
    let report = validate_group(&validator, vec![fetched("group/a", yaml)]);
    assert_eq!(
        report
            .findings
            .iter()
            .filter(|f| f.rule == Rule::DuplicateUrl)
            .count(),
        1
    );
    let last = report.findings.last().unwrap();
    assert_eq!(last.kind, FindingKind::Duplicate);
}
