use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::clients::jenkins::BuildInfo;
use crate::config::JenkinsConfig;
use crate::db::Store;
use crate::domain::Principal;
use crate::domain::naming::{artifact_branch, pipeline_name};
use crate::entities::{pipelines, projects};
use crate::generators::{PipelineScriptParams, pipeline_script};
use crate::services::ServiceError;
use crate::services::authz::{authorize, require_user};
use crate::services::ci_service::CiRegistrationService;
use crate::services::pipeline_service::{PipelineDto, PipelineService, UpdateScriptRequest};

pub struct SeaOrmPipelineService {
    store: Store,
    ci: Arc<CiRegistrationService>,
    jenkins: JenkinsConfig,
}

impl SeaOrmPipelineService {
    #[must_use]
    pub const fn new(store: Store, ci: Arc<CiRegistrationService>, jenkins: JenkinsConfig) -> Self {
        Self { store, ci, jenkins }
    }

    async fn project(&self, owner: &str, project_name: &str) -> Result<projects::Model, ServiceError> {
        self.store
            .get_project(owner, project_name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", project_name))
    }

    /// The project's pipeline, checked against the name in the request path.
    async fn pipeline(
        &self,
        owner: &str,
        project_name: &str,
        name: &str,
    ) -> Result<pipelines::Model, ServiceError> {
        self.store
            .get_pipeline_for_project(owner, project_name)
            .await?
            .filter(|p| p.pipeline_name == name)
            .ok_or_else(|| ServiceError::not_found("Pipeline", name))
    }

    fn script_for(&self, project: &projects::Model) -> Result<String, ServiceError> {
        let repo_url = project.org_repository_url.clone().ok_or_else(|| {
            ServiceError::validation(format!(
                "Project {} has no artifact repository yet; deploy it first",
                project.project_name
            ))
        })?;

        let script = pipeline_script::generate(&PipelineScriptParams {
            framework: project.framework.clone(),
            username: project.username.clone(),
            project_name: project.project_name.clone(),
            branch: artifact_branch(&project.project_name),
            repo_url,
            source_repo_url: project.repository_url.clone(),
            source_branch: String::new(),
            registry: self.jenkins.registry.clone(),
            registry_credentials_id: self.jenkins.registry_credentials_id.clone(),
            kubeconfig_credentials_id: self.jenkins.kubeconfig_credentials_id.clone(),
        })?;
        Ok(script)
    }
}

#[async_trait]
impl PipelineService for SeaOrmPipelineService {
    async fn create(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
    ) -> Result<PipelineDto, ServiceError> {
        authorize(&self.store, principal, owner).await?;
        require_user(&self.store, owner).await?;
        let project = self.project(owner, project_name).await?;

        let name = pipeline_name(owner, project_name);
        if self
            .store
            .get_pipeline_for_project(owner, project_name)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict("Pipeline", &name));
        }

        let script = self.script_for(&project)?;
        let record = self.store.create_pipeline(owner, project_name, &name).await?;

        let description = format!("Build and deploy {owner}/{project_name}");
        self.ci
            .create_job(owner, &name, &description, &script)
            .await?;

        info!(owner, project = project_name, pipeline = %name, "Pipeline created");
        Ok(record.into())
    }

    async fn list(
        &self,
        principal: &Principal,
        owner: &str,
    ) -> Result<Vec<PipelineDto>, ServiceError> {
        authorize(&self.store, principal, owner).await?;
        let pipelines = self.store.list_pipelines(owner).await?;
        Ok(pipelines.into_iter().map(Into::into).collect())
    }

    async fn get(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
    ) -> Result<PipelineDto, ServiceError> {
        authorize(&self.store, principal, owner).await?;
        self.store
            .get_pipeline_for_project(owner, project_name)
            .await?
            .map(Into::into)
            .ok_or_else(|| ServiceError::not_found("Pipeline for project", project_name))
    }

    async fn trigger_build(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
    ) -> Result<PipelineDto, ServiceError> {
        authorize(&self.store, principal, owner).await?;
        let pipeline = self.pipeline(owner, project_name, pipeline_name).await?;

        Ok(self.ci.trigger_build(&pipeline).await?.into())
    }

    async fn build_status(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
        build_number: u32,
    ) -> Result<BuildInfo, ServiceError> {
        authorize(&self.store, principal, owner).await?;
        let pipeline = self.pipeline(owner, project_name, pipeline_name).await?;

        self.ci.build_status(&pipeline, build_number).await
    }

    async fn update_script(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
        request: UpdateScriptRequest,
    ) -> Result<PipelineDto, ServiceError> {
        authorize(&self.store, principal, owner).await?;
        let pipeline = self.pipeline(owner, project_name, pipeline_name).await?;

        let script = match request.script.filter(|s| !s.trim().is_empty()) {
            Some(script) => script,
            None => {
                let project = self.project(owner, project_name).await?;
                self.script_for(&project)?
            }
        };
        self.ci
            .update_job_script(&pipeline.pipeline_name, &script)
            .await?;

        Ok(pipeline.into())
    }

    async fn delete(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        pipeline_name: &str,
    ) -> Result<(), ServiceError> {
        authorize(&self.store, principal, owner).await?;
        let pipeline = self.pipeline(owner, project_name, pipeline_name).await?;

        self.ci.delete_job(&pipeline).await
    }
}
