use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{deployments, prelude::*};

#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub username: String,
    pub project_name: String,
    pub deployment_name: String,
    pub status: String,
}

pub struct DeploymentRepository {
    conn: DatabaseConnection,
}

impl DeploymentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, deployment: NewDeployment) -> Result<deployments::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        deployments::ActiveModel {
            username: Set(deployment.username),
            project_name: Set(deployment.project_name),
            deployment_name: Set(deployment.deployment_name),
            status: Set(deployment.status),
            start_time: Set(now.clone()),
            end_time: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert deployment")
    }

    pub async fn get(
        &self,
        username: &str,
        project_name: &str,
        deployment_name: &str,
    ) -> Result<Option<deployments::Model>> {
        Deployments::find()
            .filter(deployments::Column::Username.eq(username))
            .filter(deployments::Column::ProjectName.eq(project_name))
            .filter(deployments::Column::DeploymentName.eq(deployment_name))
            .one(&self.conn)
            .await
            .context("Failed to query deployment")
    }

    pub async fn list_for_user(&self, username: &str) -> Result<Vec<deployments::Model>> {
        Deployments::find()
            .filter(deployments::Column::Username.eq(username))
            .order_by_desc(deployments::Column::StartTime)
            .all(&self.conn)
            .await
            .context("Failed to list deployments")
    }

    pub async fn list_for_project(
        &self,
        username: &str,
        project_name: &str,
    ) -> Result<Vec<deployments::Model>> {
        Deployments::find()
            .filter(deployments::Column::Username.eq(username))
            .filter(deployments::Column::ProjectName.eq(project_name))
            .order_by_desc(deployments::Column::StartTime)
            .all(&self.conn)
            .await
            .context("Failed to list project deployments")
    }

    pub async fn update_status(
        &self,
        deployment: deployments::Model,
        status: &str,
        end_time: Option<String>,
    ) -> Result<deployments::Model> {
        let mut active: deployments::ActiveModel = deployment.into();
        active.status = Set(status.to_string());
        active.end_time = Set(end_time);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to update deployment status")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Deployments::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete deployment")?;
        Ok(result.rows_affected > 0)
    }

    pub async fn delete_for_project(&self, username: &str, project_name: &str) -> Result<u64> {
        let result = Deployments::delete_many()
            .filter(deployments::Column::Username.eq(username))
            .filter(deployments::Column::ProjectName.eq(project_name))
            .exec(&self.conn)
            .await
            .context("Failed to delete project deployments")?;
        Ok(result.rows_affected)
    }
}
