use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bookmark_core::{
    classify_path, source_label, validate_group, ProjectInput, Report, SchemaValidator, SourceKind,
};
use bookmark_gitlab::{exclude_validator, GitLabClient, ProjectFetch};
use bookmark_secrets::{encrypt_token, generate_key, Credentials, ExposeSecret, SecretString};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cli::ReportFormat;
use crate::config::ValidatorConfig;

#[derive(Debug)]
pub struct LocalFile {
    /// Path below the checkout root, `/`-separated.
    pub relative: String,
    /// `None` for files that are not YAML.
    pub content: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct LocalCheckout {
    pub root: PathBuf,
    pub files: Vec<LocalFile>,
}

impl LocalCheckout {
    fn label(&self, cfg: &ValidatorConfig, file: &LocalFile) -> String {
        match &cfg.project_path {
            Some(project) => source_label(project, Path::new(&file.relative)),
            None => self.root.join(&file.relative).display().to_string(),
        }
    }

    fn into_inputs(self, cfg: &ValidatorConfig) -> Vec<ProjectInput> {
        let labels: Vec<String> = self.files.iter().map(|file| self.label(cfg, file)).collect();
        labels
            .into_iter()
            .zip(self.files)
            .map(|(project, file)| match file.content {
                Some(content) => ProjectInput::Content {
                    project,
                    content,
                    local: true,
                },
                None => ProjectInput::Foreign { project },
            })
            .collect()
    }
}

pub fn run_group(local: Option<PathBuf>, format: ReportFormat) -> Result<ExitCode> {
    let cfg = ValidatorConfig::from_env()?;
    let local = load_local(local, &cfg)?;
    let report = run_pipeline(cfg, local, fetch_remote)?;
    emit(&report, format)
}

pub fn run_check(files: Vec<PathBuf>, format: ReportFormat) -> Result<ExitCode> {
    let validator = SchemaValidator::bundled().context("bundled bookmark schema is invalid")?;
    let report = validate_group(&validator, check_inputs(files));
    emit(&report, format)
}

fn check_inputs(files: Vec<PathBuf>) -> Vec<ProjectInput> {
    files
        .into_iter()
        .map(|path| {
            let project = path.display().to_string();
            match fs::read(&path) {
                Ok(content) => ProjectInput::Content {
                    project,
                    content,
                    local: true,
                },
                Err(err) => ProjectInput::Failed {
                    project,
                    error: err.to_string(),
                },
            }
        })
        .collect()
}

pub fn run_encrypt(key_env: &str) -> Result<ExitCode> {
    let key = env::var(key_env).with_context(|| format!("{key_env} is not set"))?;
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read token from stdin")?;
    let plaintext = SecretString::new(strip_line_ending(&raw).to_string());
    let sealed =
        encrypt_token(&plaintext, &SecretString::new(key)).context("failed to encrypt token")?;
    println!("{sealed}");
    Ok(ExitCode::SUCCESS)
}

pub fn run_generate_key() -> Result<ExitCode> {
    println!("{}", generate_key().expose_secret());
    Ok(ExitCode::SUCCESS)
}

// `echo token |` appends one newline; everything else is part of the secret.
fn strip_line_ending(raw: &str) -> &str {
    match raw.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => raw,
    }
}

pub fn exit_code(report: &Report) -> ExitCode {
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn emit(report: &Report, format: ReportFormat) -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        ReportFormat::Text => report.write_text(&mut out),
        ReportFormat::Json => report.write_json(&mut out),
    }
    .and_then(|_| out.flush())
    .context("failed to write report")?;
    Ok(exit_code(report))
}

fn load_local(explicit: Option<PathBuf>, cfg: &ValidatorConfig) -> Result<Option<LocalCheckout>> {
    if let Some(path) = explicit {
        return scan_checkout(&path).map(Some);
    }
    let Some(root) = &cfg.project_dir else {
        return Ok(None);
    };
    if !root.exists() {
        debug!(path = %root.display(), "no local checkout");
        return Ok(None);
    }
    scan_checkout(root).map(Some)
}

fn scan_checkout(root: &Path) -> Result<LocalCheckout> {
    if root.is_file() {
        let content =
            fs::read(root).with_context(|| format!("failed to read {}", root.display()))?;
        let relative = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(LocalCheckout {
            root: root.parent().map(Path::to_path_buf).unwrap_or_default(),
            files: vec![LocalFile {
                relative,
                content: Some(content),
            }],
        });
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        });
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or_else(|_| entry.path());
        let relative = rel.to_string_lossy().replace('\\', "/");
        let content = match classify_path(&relative) {
            SourceKind::Hidden => continue,
            SourceKind::Other => None,
            SourceKind::Yaml => Some(
                fs::read(entry.path())
                    .with_context(|| format!("failed to read {}", entry.path().display()))?,
            ),
        };
        files.push(LocalFile { relative, content });
    }
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    debug!(root = %root.display(), files = files.len(), "scanned local checkout");
    Ok(LocalCheckout {
        root: root.to_path_buf(),
        files,
    })
}

// Without CI_PROJECT_ID/CI_PROJECT_PATH the remote copy of the checkout cannot be
// told apart by name, so byte-identical remote files are treated as that copy.
fn drop_remote_copies(inputs: &mut Vec<ProjectInput>, local: &LocalCheckout) -> usize {
    let local_bytes: HashSet<&[u8]> = local
        .files
        .iter()
        .filter_map(|file| file.content.as_deref())
        .collect();
    let before = inputs.len();
    inputs.retain(|input| match input {
        ProjectInput::Content {
            content,
            local: false,
            ..
        } => !local_bytes.contains(content.as_slice()),
        _ => true,
    });
    before - inputs.len()
}

// Credentials are opened before the fetch hook runs and move into it.
fn run_pipeline<F>(cfg: ValidatorConfig, local: Option<LocalCheckout>, fetch: F) -> Result<Report>
where
    F: FnOnce(&ValidatorConfig, Credentials, bool) -> Result<Vec<ProjectInput>>,
{
    let credentials =
        Credentials::open(&cfg.credentials).context("failed to decrypt credentials")?;
    let replace_remote = local.is_some() && cfg.knows_invoking_project();
    let mut inputs = fetch(&cfg, credentials, replace_remote)?;
    if let Some(local) = local {
        if !replace_remote {
            warn!(
                root = %local.root.display(),
                "CI_PROJECT_ID and CI_PROJECT_PATH are unset; matching the remote copy of the checkout by content"
            );
            let dropped = drop_remote_copies(&mut inputs, &local);
            debug!(dropped, "dropped remote files identical to local ones");
        }
        info!(root = %local.root.display(), files = local.files.len(), "validating local checkout");
        inputs.extend(local.into_inputs(&cfg));
    }
    let validator = SchemaValidator::bundled().context("bundled bookmark schema is invalid")?;
    let report = validate_group(&validator, inputs);
    info!(
        projects = report.projects.len(),
        records = report.record_count(),
        findings = report.findings.len(),
        "validation finished"
    );
    Ok(report)
}

fn fetch_remote(
    cfg: &ValidatorConfig,
    credentials: Credentials,
    skip_invoking: bool,
) -> Result<Vec<ProjectInput>> {
    let client = GitLabClient::new(&cfg.server_url, credentials, cfg.client.clone())
        .context("invalid CI_SERVER_URL")?;
    let rt = Runtime::new().context("failed to create tokio runtime")?;
    Ok(rt.block_on(collect_inputs(cfg, &client, skip_invoking)))
}

async fn collect_inputs(
    cfg: &ValidatorConfig,
    client: &GitLabClient,
    skip_invoking: bool,
) -> Vec<ProjectInput> {
    let projects = match client.list_group_projects(&cfg.group).await {
        Ok(projects) => projects,
        Err(err) => {
            warn!(group = %cfg.group, error = %err, "failed to list group projects");
            return vec![ProjectInput::Failed {
                project: format!("group:{}", cfg.group),
                error: err.to_string(),
            }];
        }
    };
    let mut projects = exclude_validator(projects, &cfg.validator_suffix);
    if skip_invoking {
        projects.retain(|project| !cfg.is_invoking(project));
    }
    info!(projects = projects.len(), "fetching bookmark files");
    client
        .fetch_bookmark_files(projects, &cfg.git_ref)
        .await
        .into_iter()
        .flat_map(into_inputs)
        .collect()
}

// One input per repository file, labelled `project/path`.
fn into_inputs(fetch: ProjectFetch) -> Vec<ProjectInput> {
    let project = fetch.project.path_with_namespace;
    match fetch.outcome {
        Ok(files) if files.is_empty() => vec![ProjectInput::Absent { project }],
        Ok(files) => {
            let label = |path: &str| source_label(&project, Path::new(path));
            let mut inputs: Vec<ProjectInput> = files
                .yaml
                .into_iter()
                .map(|file| ProjectInput::Content {
                    project: label(&file.path),
                    content: file.content,
                    local: false,
                })
                .collect();
            inputs.extend(
                files
                    .foreign
                    .iter()
                    .map(|path| ProjectInput::Foreign { project: label(path) }),
            );
            inputs
        }
        Err(err) => vec![ProjectInput::Failed {
            project,
            error: err.to_string(),
        }],
    }
}
