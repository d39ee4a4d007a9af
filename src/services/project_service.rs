//! Domain service for projects.
//!
//! A project is owned by one username and is unique per `(username, projectName)`;
//! its repository URL is unique across all projects.

use serde::{Deserialize, Serialize};

use crate::domain::Principal;
use crate::entities::projects;

use super::ServiceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub repository_url: String,
    pub framework: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProjectRequest {
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub framework: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: i32,
    pub username: String,
    pub project_name: String,
    pub description: Option<String>,
    pub repository_url: String,
    pub framework: String,
    pub org_repository_url: Option<String>,
    pub dockerfile_content: Option<String>,
    pub k8s_manifest_content: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<projects::Model> for ProjectDto {
    fn from(model: projects::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            project_name: model.project_name,
            description: model.description,
            repository_url: model.repository_url,
            framework: model.framework,
            org_repository_url: model.org_repository_url,
            dockerfile_content: model.dockerfile_content,
            k8s_manifest_content: model.k8s_manifest_content,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[async_trait::async_trait]
pub trait ProjectService: Send + Sync {
    /// Creates a project for `username`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Forbidden`] unless the principal is `username` or an admin
    /// - [`ServiceError::NotFound`] if `username` does not exist
    /// - [`ServiceError::Conflict`] if the name or repository URL is taken
    async fn create(
        &self,
        principal: &Principal,
        username: &str,
        request: CreateProjectRequest,
    ) -> Result<ProjectDto, ServiceError>;

    async fn list(&self, principal: &Principal, username: &str)
    -> Result<Vec<ProjectDto>, ServiceError>;

    async fn get(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<ProjectDto, ServiceError>;

    async fn update(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        request: UpdateProjectRequest,
    ) -> Result<ProjectDto, ServiceError>;

    /// Deletes one project together with its local pipeline and deployment records.
    async fn delete(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<(), ServiceError>;

    /// Deletes every project of `username`; returns how many were removed.
    async fn delete_all(&self, principal: &Principal, username: &str) -> Result<u64, ServiceError>;
}
