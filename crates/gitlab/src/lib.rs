use std::time::Duration;

use bookmark_core::{classify_path, SourceKind};
use bookmark_secrets::Credentials;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const PER_PAGE: &str = "100";
const MAX_PAGES: u32 = 1000;
const MAX_RETRY_AFTER_SECS: u64 = 60;
const MAX_BODY_IN_ERROR: usize = 300;
// 404 messages that mean "nothing there" rather than "no access" or "no project".
const TREE_NOT_FOUND: &str = "404 Tree Not Found";
const FILE_NOT_FOUND: &str = "404 File Not Found";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub max_retries: usize,
    pub backoff_base: Duration,
    pub concurrency: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupProject {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub content: Vec<u8>,
}

/// What one repository holds at the validated ref.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFiles {
    pub yaml: Vec<FetchedFile>,
    /// Non-hidden blobs without a `.yml`/`.yaml` extension.
    pub foreign: Vec<String>,
}

impl ProjectFiles {
    pub fn is_empty(&self) -> bool {
        self.yaml.is_empty() && self.foreign.is_empty()
    }
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid server url {0}")]
    InvalidUrl(String),
    #[error("credential cannot be sent as a header")]
    InvalidCredential,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ProjectFetch {
    pub project: GroupProject,
    pub outcome: Result<ProjectFiles, FetchError>,
}

pub fn exclude_validator(projects: Vec<GroupProject>, suffix: &str) -> Vec<GroupProject> {
    if suffix.is_empty() {
        return projects;
    }
    projects
        .into_iter()
        .filter(|project| {
            let is_validator = project.path_with_namespace.ends_with(suffix);
            if is_validator {
                debug!(project = %project.path_with_namespace, "skipping validator project");
            }
            !is_validator
        })
        .collect()
}

// Owns the decrypted credentials; they are dropped together with the client.
pub struct GitLabClient {
    http: Client,
    api_root: Url,
    credentials: Credentials,
    options: ClientOptions,
}

impl GitLabClient {
    pub fn new(
        server_url: &str,
        credentials: Credentials,
        options: ClientOptions,
    ) -> Result<Self, FetchError> {
        let mut api_root = Url::parse(server_url.trim())
            .map_err(|e| FetchError::InvalidUrl(format!("{server_url}: {e}")))?;
        api_root
            .path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(server_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v4"]);
        let http = Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            http,
            api_root,
            credentials,
            options,
        })
    }

    pub async fn list_group_projects(&self, group: &str) -> Result<Vec<GroupProject>, FetchError> {
        let url = self.endpoint(&["groups", group, "projects"])?;
        let projects: Vec<GroupProject> = self
            .get_pages(&url, &[("include_subgroups", "true")], None)
            .await?
            .unwrap_or_default();
        info!(group, projects = projects.len(), "listed group projects");
        Ok(projects)
    }

    /// Every entry of the repository at `git_ref`, or `None` when the ref has no tree.
    pub async fn list_tree(
        &self,
        project_id: u64,
        git_ref: &str,
    ) -> Result<Option<Vec<TreeEntry>>, FetchError> {
        let id = project_id.to_string();
        let url = self.endpoint(&["projects", &id, "repository", "tree"])?;
        self.get_pages(
            &url,
            &[("recursive", "true"), ("ref", git_ref)],
            Some(TREE_NOT_FOUND),
        )
        .await
    }

    pub async fn fetch_file(
        &self,
        project_id: u64,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<Vec<u8>>, FetchError> {
        let id = project_id.to_string();
        let url = self.endpoint(&["projects", &id, "repository", "files", path, "raw"])?;
        let deploy = self.credentials.deploy();
        let response = self
            .send_with_retry(|| {
                self.http
                    .get(url.clone())
                    .basic_auth(deploy.username(), Some(deploy.token()))
                    .query(&[("ref", git_ref)])
            })
            .await?;
        match present_or_missing(response, FILE_NOT_FOUND).await? {
            Some(response) => Ok(Some(response.bytes().await?.to_vec())),
            None => Ok(None),
        }
    }

    pub async fn fetch_project_files(
        &self,
        project: &GroupProject,
        git_ref: &str,
    ) -> Result<ProjectFiles, FetchError> {
        let mut files = ProjectFiles::default();
        let Some(entries) = self.list_tree(project.id, git_ref).await? else {
            return Ok(files);
        };
        for entry in entries.into_iter().filter(TreeEntry::is_blob) {
            match classify_path(&entry.path) {
                SourceKind::Hidden => debug!(
                    project = %project.path_with_namespace,
                    path = %entry.path,
                    "skipping hidden file"
                ),
                SourceKind::Other => files.foreign.push(entry.path),
                SourceKind::Yaml => {
                    let content = self.fetch_file(project.id, &entry.path, git_ref).await?;
                    match content {
                        Some(content) => files.yaml.push(FetchedFile {
                            path: entry.path,
                            content,
                        }),
                        None => warn!(
                            project = %project.path_with_namespace,
                            path = %entry.path,
                            "file listed in the tree could not be found"
                        ),
                    }
                }
            }
        }
        files.yaml.sort_by(|a, b| a.path.cmp(&b.path));
        files.foreign.sort();
        Ok(files)
    }

    pub async fn fetch_bookmark_files(
        &self,
        projects: Vec<GroupProject>,
        git_ref: &str,
    ) -> Vec<ProjectFetch> {
        let concurrency = self.options.concurrency.max(1);
        let mut fetched: Vec<(usize, ProjectFetch)> = stream::iter(projects.into_iter().enumerate())
            .map(|(idx, project)| async move {
                let outcome = self.fetch_project_files(&project, git_ref).await;
                match &outcome {
                    Ok(files) if files.is_empty() => info!(
                        project = %project.path_with_namespace,
                        "project has no bookmark files"
                    ),
                    Ok(files) => debug!(
                        project = %project.path_with_namespace,
                        yaml = files.yaml.len(),
                        foreign = files.foreign.len(),
                        "fetched bookmark files"
                    ),
                    Err(err) => warn!(
                        project = %project.path_with_namespace,
                        error = %err,
                        "failed to fetch bookmark files"
                    ),
                }
                (idx, ProjectFetch { project, outcome })
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        fetched.sort_by_key(|(idx, _)| *idx);
        fetched.into_iter().map(|(_, fetch)| fetch).collect()
    }

    // Follows `x-next-page` with the personal token. A 404 whose message equals
    // `missing` yields `None`; any other 404 is an error.
    async fn get_pages<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        missing: Option<&str>,
    ) -> Result<Option<Vec<T>>, FetchError> {
        let token = self.api_token_header()?;
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let page_param = page.to_string();
            let response = self
                .send_with_retry(|| {
                    self.http
                        .get(url.clone())
                        .header(PRIVATE_TOKEN_HEADER, token.clone())
                        .query(query)
                        .query(&[("per_page", PER_PAGE), ("page", page_param.as_str())])
                })
                .await?;
            let response = match missing {
                Some(message) => match present_or_missing(response, message).await? {
                    Some(response) => response,
                    None => return Ok(None),
                },
                None => ensure_success(response).await?,
            };
            let next = next_page(response.headers());
            let body = response.text().await?;
            let batch: Vec<T> =
                serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
            debug!(path = url.path(), page, count = batch.len(), "fetched page");
            items.extend(batch);
            match next {
                Some(next) if next > page && next <= MAX_PAGES => page = next,
                _ => break,
            }
        }
        Ok(Some(items))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.api_root.to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn api_token_header(&self) -> Result<HeaderValue, FetchError> {
        let mut value = HeaderValue::from_str(self.credentials.api_token())
            .map_err(|_| FetchError::InvalidCredential)?;
        value.set_sensitive(true);
        Ok(value)
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<Response, FetchError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match build().send().await {
                Ok(resp) => resp,
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect();
                    if !transient || attempt > self.options.max_retries {
                        return Err(FetchError::Transport(err));
                    }
                    debug!(attempt, error = %err, "transient request failure, retrying");
                    sleep(backoff_delay(self.options.backoff_base, attempt, None)).await;
                    continue;
                }
            };
            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt > self.options.max_retries {
                    return Err(status_error(response).await);
                }
                let wait = backoff_delay(
                    self.options.backoff_base,
                    attempt,
                    response.headers().get("retry-after"),
                );
                debug!(attempt, status = status.as_u16(), "server busy, retrying");
                sleep(wait).await;
                continue;
            }
            return Ok(response);
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, FetchError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

async fn present_or_missing(
    response: Response,
    missing: &str,
) -> Result<Option<Response>, FetchError> {
    if response.status() != StatusCode::NOT_FOUND {
        return ensure_success(response).await.map(Some);
    }
    let body = response.text().await.unwrap_or_default();
    if api_message(&body).as_deref() == Some(missing) {
        Ok(None)
    } else {
        Err(status_error_from(StatusCode::NOT_FOUND.as_u16(), body))
    }
}

fn api_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiMessage>(body)
        .ok()
        .map(|parsed| parsed.message)
}

async fn status_error(response: Response) -> FetchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    status_error_from(status, body)
}

fn status_error_from(status: u16, mut body: String) -> FetchError {
    if body.len() > MAX_BODY_IN_ERROR {
        let mut cut = MAX_BODY_IN_ERROR;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    FetchError::Status {
        status,
        body: body.trim().to_string(),
    }
}

fn next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(NEXT_PAGE_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn backoff_delay(base: Duration, attempt: usize, retry_after: Option<&HeaderValue>) -> Duration {
    if let Some(value) = retry_after {
        if let Ok(text) = value.to_str() {
            if let Ok(secs) = text.trim().parse::<u64>() {
                return Duration::from_secs(secs.clamp(1, MAX_RETRY_AFTER_SECS));
            }
        }
    }
    let capped = attempt.saturating_sub(1).min(6) as u32;
    base * (1u32 << capped)
}
