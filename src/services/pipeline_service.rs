//! Domain service for pipelines: one CI job per project.

use serde::{Deserialize, Serialize};

use crate::clients::jenkins::BuildInfo;
use crate::domain::Principal;
use crate::entities::pipelines;

use super::ServiceError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDto {
    pub id: i32,
    pub username: String,
    pub project_name: String,
    pub pipeline_name: String,
    pub last_build_number: i32,
    pub last_build_time: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<pipelines::Model> for PipelineDto {
    fn from(model: pipelines::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            project_name: model.project_name,
            pipeline_name: model.pipeline_name,
            last_build_number: model.last_build_number,
            last_build_time: model.last_build_time,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Body of a script update. Without a script the job is regenerated from the project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateScriptRequest {
    pub script: Option<String>,
}

#[async_trait::async_trait]
pub trait PipelineService: Send + Sync {
    /// Creates the pipeline record and its CI job.
    ///
    /// The project must exist and must already have an artifact repository.
    async fn create(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
    ) -> Result<PipelineDto, ServiceError>;

    async fn list(&self, principal: &Principal, owner: &str)
    -> Result<Vec<PipelineDto>, ServiceError>;

    async fn get(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
    ) -> Result<PipelineDto, ServiceError>;

    async fn trigger_build(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
    ) -> Result<PipelineDto, ServiceError>;

    /// # Errors
    ///
    /// [`ServiceError::Validation`] without contacting CI when `build_number`
    /// is beyond the last triggered build.
    async fn build_status(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
        build_number: u32,
    ) -> Result<BuildInfo, ServiceError>;

    async fn update_script(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
        request: UpdateScriptRequest,
    ) -> Result<PipelineDto, ServiceError>;

    /// Deletes the CI job, then the local record.
    async fn delete(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
    ) -> Result<(), ServiceError>;
}
