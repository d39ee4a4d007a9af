//! Domain service for deployment history records.

use serde::{Deserialize, Serialize};

use crate::domain::{DeploymentStatus, Principal};
use crate::entities::deployments;

use super::ServiceError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateDeploymentRequest {
    /// Defaults to `{username}-{projectName}-deployment`.
    pub deployment_name: Option<String>,
    pub status: Option<DeploymentStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeploymentRequest {
    pub status: DeploymentStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDto {
    pub id: i32,
    pub username: String,
    pub project_name: String,
    pub deployment_name: String,
    pub status: String,
    pub start_time: String,
    pub end_time: Option<String>,
}

impl From<deployments::Model> for DeploymentDto {
    fn from(model: deployments::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            project_name: model.project_name,
            deployment_name: model.deployment_name,
            status: model.status,
            start_time: model.start_time,
            end_time: model.end_time,
        }
    }
}

#[async_trait::async_trait]
pub trait DeploymentService: Send + Sync {
    async fn create(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        request: CreateDeploymentRequest,
    ) -> Result<DeploymentDto, ServiceError>;

    async fn list_for_user(
        &self,
        principal: &Principal,
        username: &str,
    ) -> Result<Vec<DeploymentDto>, ServiceError>;

    async fn list_for_project(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<Vec<DeploymentDto>, ServiceError>;

    async fn get(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        deployment_name: &str,
    ) -> Result<DeploymentDto, ServiceError>;

    /// Terminal statuses stamp the end time; others clear it.
    async fn update_status(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        deployment_name: &str,
        status: DeploymentStatus,
    ) -> Result<DeploymentDto, ServiceError>;

    async fn delete(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        deployment_name: &str,
    ) -> Result<(), ServiceError>;

    async fn delete_for_project(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<u64, ServiceError>;
}
