use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::JenkinsConfig;
use crate::db::{ProjectArtifacts, Store};
use crate::domain::Principal;
use crate::domain::naming::{
    artifact_branch, deployment_name, image_repository, pipeline_name, repository_name,
};
use crate::generators::{GenerateError, ManifestParams, dockerfile, kubernetes, technology_path};
use crate::services::ServiceError;
use crate::services::authz::require_user;
use crate::services::deploy_service::{DeployRequest, DeployResult, DeployService};
use crate::services::deployment_service::{CreateDeploymentRequest, DeploymentService};
use crate::services::pipeline_service::PipelineService;
use crate::services::project_service::{CreateProjectRequest, ProjectService};
use crate::services::source_control::{ArtifactFile, SourceControlService};
use crate::services::validation::{
    DERIVED_NAME_MAX, REPOSITORY_NAME_MAX, validate_derived_name, validate_name,
};

pub const DOCKERFILE_PATH: &str = "Dockerfile";
pub const MANIFEST_PATH: &str = "k8s-manifest.yaml";

pub struct DefaultDeployService {
    store: Store,
    projects: Arc<dyn ProjectService>,
    pipelines: Arc<dyn PipelineService>,
    deployments: Arc<dyn DeploymentService>,
    scm: Arc<SourceControlService>,
    jenkins: JenkinsConfig,
}

impl DefaultDeployService {
    #[must_use]
    pub fn new(
        store: Store,
        projects: Arc<dyn ProjectService>,
        pipelines: Arc<dyn PipelineService>,
        deployments: Arc<dyn DeploymentService>,
        scm: Arc<SourceControlService>,
        jenkins: JenkinsConfig,
    ) -> Self {
        Self {
            store,
            projects,
            pipelines,
            deployments,
            scm,
            jenkins,
        }
    }

    async fn run(
        &self,
        principal: &Principal,
        owner: &str,
        project_name: &str,
        request: DeployRequest,
    ) -> Result<DeployResult, ServiceError> {
        let repo_name = request
            .repo_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ServiceError::validation("repoName is required"))?
            .to_string();
        validate_name("Repository", &repo_name)?;
        // Everything named after the project must be creatable before the first remote call.
        validate_name("Project", project_name)?;
        let repository = repository_name(owner, &repo_name);
        validate_derived_name("Repository", &repository, REPOSITORY_NAME_MAX)?;
        validate_derived_name(
            "Pipeline",
            &pipeline_name(owner, project_name),
            DERIVED_NAME_MAX,
        )?;
        validate_derived_name(
            "Deployment",
            &deployment_name(owner, project_name),
            DERIVED_NAME_MAX,
        )?;

        let project = self
            .projects
            .create(
                principal,
                owner,
                CreateProjectRequest {
                    project_name: project_name.to_string(),
                    description: request.description.clone(),
                    repository_url: request.repository_url.clone(),
                    framework: request.framework.clone(),
                },
            )
            .await?;
        step(owner, project_name, "project_created");

        let (dockerfile_content, manifest_content) = self
            .generate_artifacts(owner, project_name, &request)
            .await?;
        step(owner, project_name, "artifacts_generated");

        let branch = artifact_branch(project_name);
        let provisioned = self
            .scm
            .provision(
                &repository,
                &branch,
                &[
                    ArtifactFile::new(DOCKERFILE_PATH, dockerfile_content.clone()),
                    ArtifactFile::new(MANIFEST_PATH, manifest_content.clone()),
                ],
            )
            .await?;
        step(owner, project_name, "artifacts_pushed");

        let user = require_user(&self.store, owner).await?;
        let scm_username = user.scm_username.ok_or_else(|| {
            ServiceError::NotFound(format!("No source-control account linked for {owner}"))
        })?;
        self.scm.grant_access(&repository, &scm_username).await?;

        let stored = self
            .store
            .get_project(owner, project_name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", &project.project_name))?;
        let org_repository_url = provisioned.repository.html_url.clone();
        self.store
            .set_project_artifacts(
                stored,
                ProjectArtifacts {
                    org_repository_url: org_repository_url.clone(),
                    dockerfile_content,
                    k8s_manifest_content: manifest_content,
                },
            )
            .await?;
        step(owner, project_name, "artifacts_recorded");

        let pipeline = self.pipelines.create(principal, owner, project_name).await?;
        step(owner, project_name, "pipeline_created");

        let deployment = self
            .deployments
            .create(
                principal,
                owner,
                project_name,
                CreateDeploymentRequest::default(),
            )
            .await?;
        step(owner, project_name, "deployment_recorded");

        let built = self
            .pipelines
            .trigger_build(principal, owner, project_name, &pipeline.pipeline_name)
            .await?;
        step(owner, project_name, "build_triggered");

        Ok(DeployResult {
            project_name: project.project_name,
            repository_name: repository,
            org_repository_url,
            branch: provisioned.branch,
            pipeline_name: pipeline.pipeline_name,
            deployment_name: deployment.deployment_name,
            build_number: built.last_build_number,
        })
    }

    /// Dockerfile and manifest are independent; they are rendered concurrently
    /// and either failure aborts before anything is pushed.
    async fn generate_artifacts(
        &self,
        owner: &str,
        project_name: &str,
        request: &DeployRequest,
    ) -> Result<(String, String), ServiceError> {
        let technology = technology_path(&request.framework, request.web_server.as_deref())?;
        let framework = technology.framework();
        let params = request.build.clone().with_defaults(framework.default_params());
        let port = params
            .port
            .or_else(|| framework.default_port())
            .ok_or_else(|| GenerateError::MissingParameter {
                framework: framework.as_str().to_string(),
                parameter: "port",
            })?;

        let manifest = ManifestParams {
            username: owner.to_string(),
            project_name: project_name.to_string(),
            image: format!(
                "{}:latest",
                image_repository(&self.jenkins.registry, owner, project_name)
            ),
            container_port: port,
            replicas: request.replicas,
            config_map: request.config_map.clone(),
            secret: request.secrets.clone(),
            volume: request.volume.clone(),
            autoscaling: request.autoscaling,
            resources: request.resources.clone(),
        };

        let (dockerfile_text, manifest_text) = tokio::try_join!(
            render(move || dockerfile::generate(technology, &params)),
            render(move || kubernetes::generate(&manifest)),
        )?;
        Ok((dockerfile_text, manifest_text))
    }
}

async fn render<F>(f: F) -> Result<String, ServiceError>
where
    F: FnOnce() -> Result<String, GenerateError> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

fn step(username: &str, project: &str, step: &'static str) {
    info!(username, project, step, "Deploy step completed");
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("deployments_total", "outcome" => outcome).increment(1);
}

#[async_trait]
impl DeployService for DefaultDeployService {
    async fn deploy(
        &self,
        principal: &Principal,
        project_name: &str,
        mut request: DeployRequest,
    ) -> Result<DeployResult, ServiceError> {
        let owner = request
            .username
            .take()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| principal.username.clone());

        info!(username = %owner, project = project_name, framework = %request.framework, "Deploy requested");
        match self.run(principal, &owner, project_name, request).await {
            Ok(result) => {
                record_outcome("success");
                info!(
                    username = %owner,
                    project = project_name,
                    build_number = result.build_number,
                    "Deploy finished"
                );
                Ok(result)
            }
            Err(err) => {
                record_outcome(err.kind());
                if err.is_client_error() {
                    warn!(username = %owner, project = project_name, error = %err, "Deploy rejected");
                } else {
                    error!(username = %owner, project = project_name, error = %err, "Deploy failed");
                }
                Err(err)
            }
        }
    }
}
