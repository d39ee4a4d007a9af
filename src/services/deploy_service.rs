//! The deploy flow: one request that takes a project from source URL to a
//! running CI build.

use serde::{Deserialize, Serialize};

use crate::domain::Principal;
use crate::generators::{AutoscalingSpec, DockerfileParams, EnvVar, ResourceSpec, VolumeSpec};

use super::ServiceError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub repo_name: Option<String>,
    pub repository_url: String,
    pub framework: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub web_server: Option<String>,
    /// Runtime versions, port, commands and `env`.
    #[serde(flatten)]
    pub build: DockerfileParams,
    #[serde(default)]
    pub replicas: Option<u32>,
    #[serde(default)]
    pub config_map: Option<Vec<EnvVar>>,
    #[serde(default)]
    pub secrets: Option<Vec<EnvVar>>,
    #[serde(default)]
    pub volume: Option<VolumeSpec>,
    #[serde(default)]
    pub autoscaling: Option<AutoscalingSpec>,
    #[serde(default)]
    pub resources: Option<ResourceSpec>,
    /// Owner of the new project; admins may deploy for someone else.
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub project_name: String,
    pub repository_name: String,
    pub org_repository_url: String,
    pub branch: String,
    pub pipeline_name: String,
    pub deployment_name: String,
    pub build_number: i32,
}

#[async_trait::async_trait]
pub trait DeployService: Send + Sync {
    /// Runs every step in order and stops at the first failure.
    ///
    /// Effects of completed steps are kept when a later step fails. A retry
    /// with the same project name is rejected at project creation.
    async fn deploy(
        &self,
        principal: &Principal,
        project_name: &str,
        request: DeployRequest,
    ) -> Result<DeployResult, ServiceError>;
}
