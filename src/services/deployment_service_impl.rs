use async_trait::async_trait;
use tracing::info;

use crate::db::{NewDeployment, Store};
use crate::domain::naming::deployment_name;
use crate::domain::{DeploymentStatus, Principal};
use crate::entities::deployments;
use crate::services::ServiceError;
use crate::services::authz::{authorize, require_user};
use crate::services::deployment_service::{
    CreateDeploymentRequest, DeploymentDto, DeploymentService,
};
use crate::services::validation::{DERIVED_NAME_MAX, validate_derived_name, validate_name};

pub struct SeaOrmDeploymentService {
    store: Store,
}

impl SeaOrmDeploymentService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn find(
        &self,
        username: &str,
        project_name: &str,
        name: &str,
    ) -> Result<deployments::Model, ServiceError> {
        self.store
            .get_deployment(username, project_name, name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Deployment", name))
    }
}

#[async_trait]
impl DeploymentService for SeaOrmDeploymentService {
    async fn create(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        request: CreateDeploymentRequest,
    ) -> Result<DeploymentDto, ServiceError> {
        let name = match request.deployment_name.filter(|n| !n.trim().is_empty()) {
            Some(name) => {
                validate_name("Deployment", &name)?;
                name
            }
            None => {
                let name = deployment_name(username, project_name);
                validate_derived_name("Deployment", &name, DERIVED_NAME_MAX)?;
                name
            }
        };

        authorize(&self.store, principal, username).await?;
        require_user(&self.store, username).await?;
        if self
            .store
            .get_project(username, project_name)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Project", project_name));
        }
        if self
            .store
            .get_deployment(username, project_name, &name)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict("Deployment", &name));
        }

        let status = request.status.unwrap_or(DeploymentStatus::Waiting);
        let created = self
            .store
            .create_deployment(NewDeployment {
                username: username.to_string(),
                project_name: project_name.to_string(),
                deployment_name: name,
                status: status.as_str().to_string(),
            })
            .await?;

        info!(username, project = project_name, deployment = %created.deployment_name, "Deployment recorded");
        Ok(created.into())
    }

    async fn list_for_user(
        &self,
        principal: &Principal,
        username: &str,
    ) -> Result<Vec<DeploymentDto>, ServiceError> {
        authorize(&self.store, principal, username).await?;
        let deployments = self.store.list_deployments(username).await?;
        Ok(deployments.into_iter().map(Into::into).collect())
    }

    async fn list_for_project(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<Vec<DeploymentDto>, ServiceError> {
        authorize(&self.store, principal, username).await?;
        let deployments = self
            .store
            .list_project_deployments(username, project_name)
            .await?;
        Ok(deployments.into_iter().map(Into::into).collect())
    }

    async fn get(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        deployment_name: &str,
    ) -> Result<DeploymentDto, ServiceError> {
        authorize(&self.store, principal, username).await?;
        Ok(self.find(username, project_name, deployment_name).await?.into())
    }

    async fn update_status(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        deployment_name: &str,
        status: DeploymentStatus,
    ) -> Result<DeploymentDto, ServiceError> {
        authorize(&self.store, principal, username).await?;
        let deployment = self.find(username, project_name, deployment_name).await?;

        let end_time = status
            .is_terminal()
            .then(|| chrono::Utc::now().to_rfc3339());
        let updated = self
            .store
            .update_deployment_status(deployment, status.as_str(), end_time)
            .await?;
        Ok(updated.into())
    }

    async fn delete(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
        deployment_name: &str,
    ) -> Result<(), ServiceError> {
        authorize(&self.store, principal, username).await?;
        let deployment = self.find(username, project_name, deployment_name).await?;
        self.store.delete_deployment(deployment.id).await?;
        Ok(())
    }

    async fn delete_for_project(
        &self,
        principal: &Principal,
        username: &str,
        project_name: &str,
    ) -> Result<u64, ServiceError> {
        authorize(&self.store, principal, username).await?;
        Ok(self
            .store
            .delete_project_deployments(username, project_name)
            .await?)
    }
}
