use async_trait::async_trait;
use tracing::info;

use crate::db::{NewProject, ProjectChanges, Store};
use crate::domain::Principal;
use crate::generators::Framework;
use crate::services::ServiceError;
use crate::services::authz::{authorize, require_user};
use crate::services::project_service::{
    CreateProjectRequest, ProjectDto, ProjectService, UpdateProjectRequest,
};
use crate::services::validation::{validate_name, validate_repository_url};

pub struct SeaOrmProjectService {
    store: Store,
}

impl SeaOrmProjectService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn ensure_repository_url_free(
        &self,
        url: &str,
        except_id: Option<i32>,
    ) -> Result<(), ServiceError> {
        match self.store.get_project_by_repository_url(url).await? {
            Some(existing) if Some(existing.id) != except_id => Err(ServiceError::Conflict(
                format!("Repository URL {url} is already used by another project"),
            )),
            _ => Ok(()),
        }
    }
}

fn parse_framework(name: &str) -> Result<Framework, ServiceError> {
    Ok(name.parse::<Framework>()?)
}

#[async_trait]
impl ProjectService for SeaOrmProjectService {
    async fn create(
        &self,
        principal: &Principal,
        username: &str,
        request: CreateProjectRequest,
    ) -> Result<ProjectDto, ServiceError> {
        validate_name("Project", &request.project_name)?;
        validate_repository_url(&request.repository_url)?;
        let framework = parse_framework(&request.framework)?;

        authorize(&self.store, principal, username).await?;
        require_user(&self.store, username).await?;

        if self
            .store
            .get_project(username, &request.project_name)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict("Project", &request.project_name));
        }
        self.ensure_repository_url_free(&request.repository_url, None)
            .await?;

        let project = self
            .store
            .create_project(NewProject {
                username: username.to_string(),
                project_name: request.project_name,
                description: request.description.filter(|d| !d.trim().is_empty()),
                repository_url: request.repository_url,
                framework: framework.as_str().to_string(),
            })
            .await?;

        info!(username, project = %project.project_name, "Project created");
        Ok(project.into())
    }

    async fn list(
        &self,
        principal: &Principal,
        username: &str,
    ) -> Result<Vec<ProjectDto>, ServiceError> {
        authorize(&self.store, principal, username).await?;
        require_user(&self.store, username).await?;

        let projects = self.store.list_projects(username).await?;
        Ok(projects.into_iter().map(Into::into).collect())
    }

    async fn get(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<ProjectDto, ServiceError> {
        authorize(&self.store, principal, username).await?;

        self.store
            .get_project(username, project_name)
            .await?
            .map(Into::into)
            .ok_or_else(|| ServiceError::not_found("Project", project_name))
    }

    async fn update(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        request: UpdateProjectRequest,
    ) -> Result<ProjectDto, ServiceError> {
        authorize(&self.store, principal, username).await?;

        let project = self
            .store
            .get_project(username, project_name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", project_name))?;

        if let Some(url) = &request.repository_url {
            validate_repository_url(url)?;
            self.ensure_repository_url_free(url, Some(project.id))
                .await?;
        }
        let framework = request
            .framework
            .as_deref()
            .map(parse_framework)
            .transpose()?
            .map(|f| f.as_str().to_string());

        let updated = self
            .store
            .update_project(
                project,
                ProjectChanges {
                    description: request.description,
                    repository_url: request.repository_url,
                    framework,
                },
            )
            .await?;

        Ok(updated.into())
    }

    async fn delete(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<(), ServiceError> {
        authorize(&self.store, principal, username).await?;

        if !self.store.delete_project(username, project_name).await? {
            return Err(ServiceError::not_found("Project", project_name));
        }
        info!(username, project = project_name, "Project deleted");
        Ok(())
    }

    async fn delete_all(&self, principal: &Principal, username: &str) -> Result<u64, ServiceError> {
        authorize(&self.store, principal, username).await?;
        require_user(&self.store, username).await?;

        let removed = self.store.delete_all_projects(username).await?;
        info!(username, removed, "Deleted all projects");
        Ok(removed)
    }
}
