use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::JenkinsConfig;

#[derive(Debug, Error)]
pub enum CiError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("CI request failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("CI server unreachable: {0}")]
    Transport(String),

    #[error("CI client misconfigured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// State of one build as reported by the CI server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub number: u32,
    /// `SUCCESS`, `FAILURE`, `ABORTED`, `UNSTABLE`; absent while running.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    #[serde(default, alias = "duration")]
    pub duration_ms: u64,
    /// Start time in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub url: String,
}

/// Job, build and view management on the CI server.
#[async_trait::async_trait]
pub trait CiServer: Send + Sync {
    async fn view_exists(&self, view: &str) -> Result<bool, CiError>;

    async fn create_view(&self, view: &str, config_xml: &str) -> Result<(), CiError>;

    async fn add_job_to_view(&self, view: &str, job: &str) -> Result<(), CiError>;

    /// Fails with [`CiError::AlreadyExists`] rather than overwriting.
    async fn create_job(&self, job: &str, config_xml: &str) -> Result<(), CiError>;

    async fn delete_job(&self, job: &str) -> Result<(), CiError>;

    async fn get_job_config(&self, job: &str) -> Result<String, CiError>;

    async fn update_job_config(&self, job: &str, config_xml: &str) -> Result<(), CiError>;

    async fn build_job(&self, job: &str) -> Result<(), CiError>;

    async fn get_build(&self, job: &str, number: u32) -> Result<BuildInfo, CiError>;
}

/// Jenkins REST client authenticating with a user API token.
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    client: Client,
    base_url: String,
    username: String,
    api_token: String,
}

impl JenkinsClient {
    pub fn new(config: &JenkinsConfig) -> Result<Self, CiError> {
        let client = Client::builder()
            .user_agent(concat!("shipwright/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| CiError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn job_url(&self, job: &str) -> String {
        format!("{}/job/{}", self.base_url, urlencoding::encode(job))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.api_token))
        }
    }

    async fn expect_success(response: Response, what: &str) -> Result<Response, CiError> {
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }
        let reason = response
            .headers()
            .get("X-Error")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        let message = reason.unwrap_or_else(|| body.chars().take(200).collect());

        Err(match status {
            StatusCode::NOT_FOUND => CiError::NotFound(what.to_string()),
            _ if message.contains("already exists") => CiError::AlreadyExists(what.to_string()),
            _ => CiError::Http {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait::async_trait]
impl CiServer for JenkinsClient {
    async fn view_exists(&self, view: &str) -> Result<bool, CiError> {
        let url = format!("{}/view/{}/api/json", self.base_url, urlencoding::encode(view));
        let response = self.authed(self.client.get(url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => Self::expect_success(response, view).await.map(|_| true),
        }
    }

    async fn create_view(&self, view: &str, config_xml: &str) -> Result<(), CiError> {
        let url = format!("{}/createView", self.base_url);
        let response = self
            .authed(self.client.post(url))
            .query(&[("name", view)])
            .header("Content-Type", "application/xml")
            .body(config_xml.to_string())
            .send()
            .await?;
        Self::expect_success(response, &format!("view {view}")).await?;
        debug!(view, "Created CI view");
        Ok(())
    }

    async fn add_job_to_view(&self, view: &str, job: &str) -> Result<(), CiError> {
        let url = format!(
            "{}/view/{}/addJobToView",
            self.base_url,
            urlencoding::encode(view)
        );
        let response = self
            .authed(self.client.post(url))
            .query(&[("name", job)])
            .send()
            .await?;
        Self::expect_success(response, &format!("view {view}")).await?;
        Ok(())
    }

    async fn create_job(&self, job: &str, config_xml: &str) -> Result<(), CiError> {
        let url = format!("{}/createItem", self.base_url);
        let response = self
            .authed(self.client.post(url))
            .query(&[("name", job)])
            .header("Content-Type", "application/xml")
            .body(config_xml.to_string())
            .send()
            .await?;
        Self::expect_success(response, &format!("job {job}")).await?;
        debug!(job, "Created CI job");
        Ok(())
    }

    async fn delete_job(&self, job: &str) -> Result<(), CiError> {
        let url = format!("{}/doDelete", self.job_url(job));
        let response = self.authed(self.client.post(url)).send().await?;
        Self::expect_success(response, &format!("job {job}")).await?;
        Ok(())
    }

    async fn get_job_config(&self, job: &str) -> Result<String, CiError> {
        let url = format!("{}/config.xml", self.job_url(job));
        let response = self.authed(self.client.get(url)).send().await?;
        let response = Self::expect_success(response, &format!("job {job}")).await?;
        Ok(response.text().await?)
    }

    async fn update_job_config(&self, job: &str, config_xml: &str) -> Result<(), CiError> {
        let url = format!("{}/config.xml", self.job_url(job));
        let response = self
            .authed(self.client.post(url))
            .header("Content-Type", "application/xml")
            .body(config_xml.to_string())
            .send()
            .await?;
        Self::expect_success(response, &format!("job {job}")).await?;
        Ok(())
    }

    async fn build_job(&self, job: &str) -> Result<(), CiError> {
        let url = format!("{}/build", self.job_url(job));
        let response = self.authed(self.client.post(url)).send().await?;
        Self::expect_success(response, &format!("job {job}")).await?;
        Ok(())
    }

    async fn get_build(&self, job: &str, number: u32) -> Result<BuildInfo, CiError> {
        let url = format!("{}/{number}/api/json", self.job_url(job));
        let response = self.authed(self.client.get(url)).send().await?;
        let response =
            Self::expect_success(response, &format!("build {number} of job {job}")).await?;
        Ok(response.json().await?)
    }
}
