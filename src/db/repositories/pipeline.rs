use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{pipelines, prelude::*};

pub struct PipelineRepository {
    conn: DatabaseConnection,
}

impl PipelineRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        username: &str,
        project_name: &str,
        pipeline_name: &str,
    ) -> Result<pipelines::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        pipelines::ActiveModel {
            username: Set(username.to_string()),
            project_name: Set(project_name.to_string()),
            pipeline_name: Set(pipeline_name.to_string()),
            last_build_number: Set(0),
            last_build_time: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert pipeline")
    }

    /// The pipeline of a project (at most one exists).
    pub async fn get_for_project(
        &self,
        username: &str,
        project_name: &str,
    ) -> Result<Option<pipelines::Model>> {
        Pipelines::find()
            .filter(pipelines::Column::Username.eq(username))
            .filter(pipelines::Column::ProjectName.eq(project_name))
            .one(&self.conn)
            .await
            .context("Failed to query pipeline")
    }

    pub async fn list_for_user(&self, username: &str) -> Result<Vec<pipelines::Model>> {
        Pipelines::find()
            .filter(pipelines::Column::Username.eq(username))
            .order_by_asc(pipelines::Column::PipelineName)
            .all(&self.conn)
            .await
            .context("Failed to list pipelines")
    }

    /// Bumps `last_build_number` in a single statement and stamps the build time.
    pub async fn record_build(&self, id: i32, at: &str) -> Result<pipelines::Model> {
        Pipelines::update_many()
            .col_expr(
                pipelines::Column::LastBuildNumber,
                Expr::col(pipelines::Column::LastBuildNumber).add(1),
            )
            .col_expr(pipelines::Column::LastBuildTime, Expr::value(at.to_string()))
            .col_expr(pipelines::Column::UpdatedAt, Expr::value(at.to_string()))
            .filter(pipelines::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record build")?;

        Pipelines::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to reload pipeline")?
            .ok_or_else(|| anyhow::anyhow!("Pipeline {id} disappeared while recording a build"))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Pipelines::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete pipeline")?;
        Ok(result.rows_affected > 0)
    }
}
