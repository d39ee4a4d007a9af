use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{deployments, otps, pipelines, projects, users};

pub mod migrator;
pub mod repositories;

pub use repositories::deployment::NewDeployment;
pub use repositories::project::{NewProject, ProjectArtifacts, ProjectChanges};
pub use repositories::user::NewUser;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn project_repo(&self) -> repositories::project::ProjectRepository {
        repositories::project::ProjectRepository::new(self.conn.clone())
    }

    fn pipeline_repo(&self) -> repositories::pipeline::PipelineRepository {
        repositories::pipeline::PipelineRepository::new(self.conn.clone())
    }

    fn deployment_repo(&self) -> repositories::deployment::DeploymentRepository {
        repositories::deployment::DeploymentRepository::new(self.conn.clone())
    }

    fn otp_repo(&self) -> repositories::otp::OtpRepository {
        repositories::otp::OtpRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(&self, user: NewUser) -> Result<users::Model> {
        self.user_repo().create(user).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_login(&self, identifier: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_login(identifier).await
    }

    pub async fn list_users(&self) -> Result<Vec<users::Model>> {
        self.user_repo().list().await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn update_user_email(
        &self,
        user: users::Model,
        email: String,
    ) -> Result<users::Model> {
        self.user_repo().update_email(user, email).await
    }

    pub async fn link_scm_identity(
        &self,
        user: users::Model,
        scm_username: String,
        scm_token: String,
    ) -> Result<users::Model> {
        self.user_repo()
            .set_scm_identity(user, scm_username, scm_token)
            .await
    }

    pub async fn set_user_role(&self, user: users::Model, role: &str) -> Result<users::Model> {
        self.user_repo().set_role(user, role).await
    }

    pub async fn set_refresh_token_id(&self, user_id: i32, token_id: Option<String>) -> Result<()> {
        self.user_repo().set_refresh_token_id(user_id, token_id).await
    }

    pub async fn update_password_hash(&self, user: users::Model, hash: String) -> Result<()> {
        self.user_repo().update_password_hash(user, hash).await
    }

    // Projects

    pub async fn create_project(&self, project: NewProject) -> Result<projects::Model> {
        self.project_repo().create(project).await
    }

    pub async fn get_project(
        &self,
        username: &str,
        project_name: &str,
    ) -> Result<Option<projects::Model>> {
        self.project_repo().get(username, project_name).await
    }

    pub async fn get_project_by_repository_url(
        &self,
        url: &str,
    ) -> Result<Option<projects::Model>> {
        self.project_repo().get_by_repository_url(url).await
    }

    pub async fn list_projects(&self, username: &str) -> Result<Vec<projects::Model>> {
        self.project_repo().list_for_user(username).await
    }

    pub async fn update_project(
        &self,
        project: projects::Model,
        changes: ProjectChanges,
    ) -> Result<projects::Model> {
        self.project_repo().update(project, changes).await
    }

    pub async fn set_project_artifacts(
        &self,
        project: projects::Model,
        artifacts: ProjectArtifacts,
    ) -> Result<projects::Model> {
        self.project_repo().set_artifacts(project, artifacts).await
    }

    pub async fn delete_project(&self, username: &str, project_name: &str) -> Result<bool> {
        self.project_repo().delete(username, project_name).await
    }

    pub async fn delete_all_projects(&self, username: &str) -> Result<u64> {
        self.project_repo().delete_all_for_user(username).await
    }

    // Pipelines

    pub async fn create_pipeline(
        &self,
        username: &str,
        project_name: &str,
        pipeline_name: &str,
    ) -> Result<pipelines::Model> {
        self.pipeline_repo()
            .create(username, project_name, pipeline_name)
            .await
    }

    pub async fn get_pipeline_for_project(
        &self,
        username: &str,
        project_name: &str,
    ) -> Result<Option<pipelines::Model>> {
        self.pipeline_repo()
            .get_for_project(username, project_name)
            .await
    }

    pub async fn list_pipelines(&self, username: &str) -> Result<Vec<pipelines::Model>> {
        self.pipeline_repo().list_for_user(username).await
    }

    pub async fn record_build(&self, pipeline_id: i32, at: &str) -> Result<pipelines::Model> {
        self.pipeline_repo().record_build(pipeline_id, at).await
    }

    pub async fn delete_pipeline(&self, pipeline_id: i32) -> Result<bool> {
        self.pipeline_repo().delete(pipeline_id).await
    }

    // Deployments

    pub async fn create_deployment(&self, deployment: NewDeployment) -> Result<deployments::Model> {
        self.deployment_repo().create(deployment).await
    }

    pub async fn get_deployment(
        &self,
        username: &str,
        project_name: &str,
        deployment_name: &str,
    ) -> Result<Option<deployments::Model>> {
        self.deployment_repo()
            .get(username, project_name, deployment_name)
            .await
    }

    pub async fn list_deployments(&self, username: &str) -> Result<Vec<deployments::Model>> {
        self.deployment_repo().list_for_user(username).await
    }

    pub async fn list_project_deployments(
        &self,
        username: &str,
        project_name: &str,
    ) -> Result<Vec<deployments::Model>> {
        self.deployment_repo()
            .list_for_project(username, project_name)
            .await
    }

    pub async fn update_deployment_status(
        &self,
        deployment: deployments::Model,
        status: &str,
        end_time: Option<String>,
    ) -> Result<deployments::Model> {
        self.deployment_repo()
            .update_status(deployment, status, end_time)
            .await
    }

    pub async fn delete_deployment(&self, deployment_id: i32) -> Result<bool> {
        self.deployment_repo().delete(deployment_id).await
    }

    pub async fn delete_project_deployments(
        &self,
        username: &str,
        project_name: &str,
    ) -> Result<u64> {
        self.deployment_repo()
            .delete_for_project(username, project_name)
            .await
    }

    // One-time passwords

    pub async fn replace_otp(
        &self,
        email: &str,
        code: &str,
        expires_at: &str,
    ) -> Result<otps::Model> {
        self.otp_repo().replace_for_email(email, code, expires_at).await
    }

    pub async fn latest_otp(&self, email: &str) -> Result<Option<otps::Model>> {
        self.otp_repo().latest_for_email(email).await
    }

    pub async fn list_otps(&self, email: &str) -> Result<Vec<otps::Model>> {
        self.otp_repo().list_for_email(email).await
    }

    pub async fn increment_otp_attempts(&self, otp_id: i32) -> Result<()> {
        self.otp_repo().increment_attempts(otp_id).await
    }

    pub async fn mark_otp_verified(&self, otp_id: i32) -> Result<()> {
        self.otp_repo().mark_verified(otp_id).await
    }

    pub async fn delete_otps(&self, email: &str) -> Result<u64> {
        self.otp_repo().delete_for_email(email).await
    }
}

/// Whether `err` wraps a unique-constraint violation from the database.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<DbErr>()
            .and_then(DbErr::sql_err)
            .is_some_and(|e| matches!(e, SqlErr::UniqueConstraintViolation(_)))
    })
}
