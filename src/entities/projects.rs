use sea_orm::entity::prelude::*;

/// Unique per `(username, project_name)`; that index is created by the migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub username: String,

    pub project_name: String,

    pub description: Option<String>,

    #[sea_orm(unique)]
    pub repository_url: String,

    pub framework: String,

    /// Organization repository holding the generated artifacts
    pub org_repository_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub dockerfile_content: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub k8s_manifest_content: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
