use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use bookmark_gitlab::{ClientOptions, GroupProject};
use bookmark_secrets::{SealedCredentials, SealedSecret};
use tracing::warn;

pub const DEFAULT_REF: &str = "main";
pub const DEFAULT_VALIDATOR_SUFFIX: &str = "data-validator";
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 500;

// Inclusive bounds for the numeric overrides.
const CONCURRENCY_RANGE: (u64, u64) = (1, 64);
const TIMEOUT_SECS_RANGE: (u64, u64) = (1, 300);
const MAX_RETRIES_RANGE: (u64, u64) = (0, 10);
const BACKOFF_MS_RANGE: (u64, u64) = (0, 60_000);

#[derive(Debug)]
pub struct ValidatorConfig {
    pub server_url: String,
    pub group: String,
    pub credentials: SealedCredentials,
    pub git_ref: String,
    pub validator_suffix: String,
    pub project_id: Option<String>,
    pub project_path: Option<String>,
    pub project_dir: Option<PathBuf>,
    pub client: ClientOptions,
}

impl ValidatorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut missing = Vec::new();
        let mut required = |name: &'static str| {
            optional(name).unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };
        let server_url = required("CI_SERVER_URL");
        let group = required("BOOKMARK_DATA_GROUP_ID");
        let deploy_token = required("ENCRYPTED_DEPLOY_TOKEN");
        let deploy_key = required("ENCRYPTION_KEY");
        let deploy_username = required("DEPLOY_TOKEN_USERNAME");
        let api_token = required("ENCRYPTED_PAT");
        let api_key = required("PAT_ENCRYPTION_KEY");
        if !missing.is_empty() {
            bail!(
                "missing required environment variables: {}",
                missing.join(", ")
            );
        }
        let numeric = |name: &str, default: u64, (min, max): (u64, u64)| {
            let value = optional(name)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default);
            let clamped = value.clamp(min, max);
            if clamped != value {
                warn!(variable = name, value, used = clamped, "setting out of range, clamped");
            }
            clamped
        };
        let client = ClientOptions {
            timeout: Duration::from_secs(numeric(
                "BOOKMARK_VALIDATOR_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
                TIMEOUT_SECS_RANGE,
            )),
            max_retries: numeric(
                "BOOKMARK_VALIDATOR_MAX_RETRIES",
                DEFAULT_MAX_RETRIES as u64,
                MAX_RETRIES_RANGE,
            ) as usize,
            backoff_base: Duration::from_millis(numeric(
                "BOOKMARK_VALIDATOR_BACKOFF_MS",
                DEFAULT_BACKOFF_MS,
                BACKOFF_MS_RANGE,
            )),
            concurrency: numeric(
                "BOOKMARK_VALIDATOR_CONCURRENCY",
                DEFAULT_CONCURRENCY as u64,
                CONCURRENCY_RANGE,
            ) as usize,
        };
        Ok(Self {
            server_url,
            group,
            credentials: SealedCredentials {
                deploy_username,
                deploy_token: SealedSecret::new(deploy_token, deploy_key),
                api_token: SealedSecret::new(api_token, api_key),
            },
            git_ref: optional("BOOKMARK_REF").unwrap_or_else(|| DEFAULT_REF.into()),
            validator_suffix: lookup("VALIDATOR_PROJECT_SUFFIX")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_VALIDATOR_SUFFIX.into()),
            project_id: optional("CI_PROJECT_ID"),
            project_path: optional("CI_PROJECT_PATH"),
            project_dir: optional("CI_PROJECT_DIR").map(PathBuf::from),
            client,
        })
    }

    pub fn knows_invoking_project(&self) -> bool {
        self.project_id.is_some() || self.project_path.is_some()
    }

    pub fn is_invoking(&self, project: &GroupProject) -> bool {
        let by_id = self
            .project_id
            .as_deref()
            .is_some_and(|id| id == project.id.to_string());
        let by_path = self
            .project_path
            .as_deref()
            .is_some_and(|path| path == project.path_with_namespace);
        by_id || by_path
    }
}
