use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::GithubConfig;

#[derive(Debug, Error)]
pub enum ScmError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository {0} has no commits")]
    EmptyRepository(String),

    #[error("Source control request failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Source control unreachable: {0}")]
    Transport(String),

    #[error("Source control client misconfigured: {0}")]
    Config(String),
}

impl ScmError {
    /// Server-side or network failures that are worth one more attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ScmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Repository hosting operations used to publish generated artifacts.
///
/// Repository names are relative to the configured organization.
#[async_trait::async_trait]
pub trait SourceControl: Send + Sync {
    async fn get_repository(&self, name: &str) -> Result<Option<RepositoryInfo>, ScmError>;

    /// Creates a private, empty repository.
    async fn create_repository(&self, name: &str) -> Result<RepositoryInfo, ScmError>;

    /// Head commit of `branch`. An empty repository yields [`ScmError::EmptyRepository`].
    async fn get_branch_sha(&self, repo: &str, branch: &str) -> Result<String, ScmError>;

    /// Creates `branch` at `sha`. An existing branch yields [`ScmError::AlreadyExists`].
    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), ScmError>;

    /// Blob SHA of `path` on `branch`, if the file exists.
    async fn get_file_sha(
        &self,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Option<String>, ScmError>;

    /// Creates or updates a file. `sha` must be the current blob SHA when updating.
    async fn put_file(&self, request: PutFile<'_>) -> Result<(), ScmError>;

    /// Grants `username` push access to `repo`.
    async fn add_collaborator(&self, repo: &str, username: &str) -> Result<(), ScmError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PutFile<'a> {
    pub repo: &'a str,
    pub path: &'a str,
    pub content: &'a str,
    pub message: &'a str,
    /// Default branch when `None`.
    pub branch: Option<&'a str>,
    pub sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct ContentInfo {
    sha: String,
}

#[derive(Serialize)]
struct CreateRepository<'a> {
    name: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct CollaboratorPermission {
    permission: &'static str,
}

/// GitHub REST client scoped to one organization.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_url: String,
    organization: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, ScmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        if !config.token.is_empty() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|e| ScmError::Config(format!("invalid token: {e}")))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .user_agent(concat!("shipwright/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ScmError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            organization: config.organization.clone(),
        })
    }

    fn repo_url(&self, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(&self.organization),
            urlencoding::encode(repo)
        )
    }

    async fn error_from(response: Response) -> ScmError {
        let status = response.status();
        let message = response
            .json::<ApiMessage>()
            .await
            .map(|m| m.message)
            .unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            ScmError::NotFound(message)
        } else {
            ScmError::Http {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait::async_trait]
impl SourceControl for GithubClient {
    async fn get_repository(&self, name: &str) -> Result<Option<RepositoryInfo>, ScmError> {
        let response = self.client.get(self.repo_url(name)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json().await?)),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn create_repository(&self, name: &str) -> Result<RepositoryInfo, ScmError> {
        let url = format!(
            "{}/orgs/{}/repos",
            self.api_url,
            urlencoding::encode(&self.organization)
        );
        let response = self
            .client
            .post(url)
            .json(&CreateRepository {
                name,
                private: true,
                auto_init: false,
            })
            .send()
            .await?;

        if response.status().is_success() {
            debug!(repo = name, "Created repository");
            return Ok(response.json().await?);
        }
        match Self::error_from(response).await {
            ScmError::Http { status: 422, message } => Err(ScmError::AlreadyExists(format!(
                "repository {name}: {message}"
            ))),
            other => Err(other),
        }
    }

    async fn get_branch_sha(&self, repo: &str, branch: &str) -> Result<String, ScmError> {
        let url = format!("{}/git/ref/heads/{branch}", self.repo_url(repo));
        let response = self.client.get(url).send().await?;

        match response.status() {
            // 409: "Git Repository is empty."; 404: no such ref yet.
            StatusCode::CONFLICT | StatusCode::NOT_FOUND => {
                Err(ScmError::EmptyRepository(repo.to_string()))
            }
            s if s.is_success() => Ok(response.json::<GitRef>().await?.object.sha),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), ScmError> {
        let url = format!("{}/git/refs", self.repo_url(repo));
        let response = self
            .client
            .post(url)
            .json(&CreateRef {
                reference: format!("refs/heads/{branch}"),
                sha,
            })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        match Self::error_from(response).await {
            ScmError::Http { status: 422, message } => {
                Err(ScmError::AlreadyExists(format!("branch {branch}: {message}")))
            }
            other => Err(other),
        }
    }

    async fn get_file_sha(
        &self,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Option<String>, ScmError> {
        let url = format!("{}/contents/{path}", self.repo_url(repo));
        let mut request = self.client.get(url);
        if let Some(branch) = branch {
            request = request.query(&[("ref", branch)]);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json::<ContentInfo>().await?.sha)),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn put_file(&self, request: PutFile<'_>) -> Result<(), ScmError> {
        let url = format!("{}/contents/{}", self.repo_url(request.repo), request.path);
        let response = self
            .client
            .put(url)
            .json(&PutContents {
                message: request.message,
                content: STANDARD.encode(request.content.as_bytes()),
                branch: request.branch,
                sha: request.sha,
            })
            .send()
            .await?;

        if response.status().is_success() {
            debug!(repo = request.repo, path = request.path, "Committed file");
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn add_collaborator(&self, repo: &str, username: &str) -> Result<(), ScmError> {
        let url = format!(
            "{}/collaborators/{}",
            self.repo_url(repo),
            urlencoding::encode(username)
        );
        let response = self
            .client
            .put(url)
            .json(&CollaboratorPermission { permission: "push" })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }
}
