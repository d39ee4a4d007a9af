use crate::entities::{deployments, otps, pipelines, prelude::*, projects};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Projects)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Pipelines)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Deployments)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Otps)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Ownership-scoped uniqueness, enforced by the database so that
        // concurrent creates resolve to one winner.
        manager
            .create_index(
                Index::create()
                    .name("idx_projects_owner_name")
                    .table(Projects)
                    .col(projects::Column::Username)
                    .col(projects::Column::ProjectName)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pipelines_owner_project")
                    .table(Pipelines)
                    .col(pipelines::Column::Username)
                    .col(pipelines::Column::ProjectName)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deployments_owner_project_name")
                    .table(Deployments)
                    .col(deployments::Column::Username)
                    .col(deployments::Column::ProjectName)
                    .col(deployments::Column::DeploymentName)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_otps_email")
                    .table(Otps)
                    .col(otps::Column::Email)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Otps).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deployments).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pipelines).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
