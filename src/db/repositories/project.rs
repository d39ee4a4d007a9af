use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{deployments, pipelines, prelude::*, projects};

#[derive(Debug, Clone)]
pub struct NewProject {
    pub username: String,
    pub project_name: String,
    pub description: Option<String>,
    pub repository_url: String,
    pub framework: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub framework: Option<String>,
}

/// Artifacts produced by a deploy run.
#[derive(Debug, Clone)]
pub struct ProjectArtifacts {
    pub org_repository_url: String,
    pub dockerfile_content: String,
    pub k8s_manifest_content: String,
}

pub struct ProjectRepository {
    conn: DatabaseConnection,
}

impl ProjectRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, project: NewProject) -> Result<projects::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        projects::ActiveModel {
            username: Set(project.username),
            project_name: Set(project.project_name),
            description: Set(project.description),
            repository_url: Set(project.repository_url),
            framework: Set(project.framework),
            org_repository_url: Set(None),
            dockerfile_content: Set(None),
            k8s_manifest_content: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert project")
    }

    pub async fn get(&self, username: &str, project_name: &str) -> Result<Option<projects::Model>> {
        Projects::find()
            .filter(projects::Column::Username.eq(username))
            .filter(projects::Column::ProjectName.eq(project_name))
            .one(&self.conn)
            .await
            .context("Failed to query project")
    }

    pub async fn get_by_repository_url(&self, url: &str) -> Result<Option<projects::Model>> {
        Projects::find()
            .filter(projects::Column::RepositoryUrl.eq(url))
            .one(&self.conn)
            .await
            .context("Failed to query project by repository URL")
    }

    pub async fn list_for_user(&self, username: &str) -> Result<Vec<projects::Model>> {
        Projects::find()
            .filter(projects::Column::Username.eq(username))
            .order_by_asc(projects::Column::ProjectName)
            .all(&self.conn)
            .await
            .context("Failed to list projects")
    }

    pub async fn update(
        &self,
        project: projects::Model,
        changes: ProjectChanges,
    ) -> Result<projects::Model> {
        let mut active: projects::ActiveModel = project.into();
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(url) = changes.repository_url {
            active.repository_url = Set(url);
        }
        if let Some(framework) = changes.framework {
            active.framework = Set(framework);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to update project")
    }

    pub async fn set_artifacts(
        &self,
        project: projects::Model,
        artifacts: ProjectArtifacts,
    ) -> Result<projects::Model> {
        let mut active: projects::ActiveModel = project.into();
        active.org_repository_url = Set(Some(artifacts.org_repository_url));
        active.dockerfile_content = Set(Some(artifacts.dockerfile_content));
        active.k8s_manifest_content = Set(Some(artifacts.k8s_manifest_content));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to store project artifacts")
    }

    /// Deletes one project together with its local pipeline and deployment rows.
    pub async fn delete(&self, username: &str, project_name: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        Pipelines::delete_many()
            .filter(pipelines::Column::Username.eq(username))
            .filter(pipelines::Column::ProjectName.eq(project_name))
            .exec(&txn)
            .await?;

        Deployments::delete_many()
            .filter(deployments::Column::Username.eq(username))
            .filter(deployments::Column::ProjectName.eq(project_name))
            .exec(&txn)
            .await?;

        let result = Projects::delete_many()
            .filter(projects::Column::Username.eq(username))
            .filter(projects::Column::ProjectName.eq(project_name))
            .exec(&txn)
            .await?;

        txn.commit().await.context("Failed to delete project")?;
        Ok(result.rows_affected > 0)
    }

    /// Deletes every project of `username` and their local children.
    pub async fn delete_all_for_user(&self, username: &str) -> Result<u64> {
        let txn = self.conn.begin().await?;

        Pipelines::delete_many()
            .filter(pipelines::Column::Username.eq(username))
            .exec(&txn)
            .await?;

        Deployments::delete_many()
            .filter(deployments::Column::Username.eq(username))
            .exec(&txn)
            .await?;

        let result = Projects::delete_many()
            .filter(projects::Column::Username.eq(username))
            .exec(&txn)
            .await?;

        txn.commit().await.context("Failed to delete projects")?;
        Ok(result.rows_affected)
    }
}
