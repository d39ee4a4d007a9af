//! Domain service for accounts and their linked source-control identity.

use serde::{Deserialize, Serialize};

use crate::domain::Principal;
use crate::entities::users;

use super::ServiceError;

/// Public view of a user. The linked access token is never exposed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub scm_username: Option<String>,
    pub scm_linked: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for UserDto {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            scm_linked: model.scm_token.is_some(),
            scm_username: model.scm_username,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSourceControlRequest {
    pub username: String,
    pub access_token: String,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn get_me(&self, principal: &Principal) -> Result<UserDto, ServiceError>;

    /// Self or admin.
    async fn get_user(&self, principal: &Principal, username: &str)
    -> Result<UserDto, ServiceError>;

    /// Admin only.
    async fn list_users(&self, principal: &Principal) -> Result<Vec<UserDto>, ServiceError>;

    async fn update_profile(
        &self,
        principal: &Principal,
        username: &str,
        request: UpdateProfileRequest,
    ) -> Result<UserDto, ServiceError>;

    async fn link_source_control(
        &self,
        principal: &Principal,
        username: &str,
        request: LinkSourceControlRequest,
    ) -> Result<UserDto, ServiceError>;

    /// Grants the admin role.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Forbidden`] unless the principal is an admin acting on someone else
    /// - [`ServiceError::Conflict`] if the target already is an admin
    async fn promote(&self, principal: &Principal, username: &str)
    -> Result<UserDto, ServiceError>;
}
