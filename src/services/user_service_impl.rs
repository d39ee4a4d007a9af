use async_trait::async_trait;
use tracing::info;

use crate::db::Store;
use crate::domain::{Principal, Role};
use crate::services::ServiceError;
use crate::services::authz::{acting_user, authorize, is_admin, require_admin, require_user};
use crate::services::user_service::{
    LinkSourceControlRequest, UpdateProfileRequest, UserDto, UserService,
};
use crate::services::validation::validate_email;

pub struct SeaOrmUserService {
    store: Store,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn get_me(&self, principal: &Principal) -> Result<UserDto, ServiceError> {
        Ok(acting_user(&self.store, principal).await?.into())
    }

    async fn get_user(
        &self,
        principal: &Principal,
        username: &str,
    ) -> Result<UserDto, ServiceError> {
        authorize(&self.store, principal, username).await?;
        Ok(require_user(&self.store, username).await?.into())
    }

    async fn list_users(&self, principal: &Principal) -> Result<Vec<UserDto>, ServiceError> {
        require_admin(&self.store, principal).await?;
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    async fn update_profile(
        &self,
        principal: &Principal,
        username: &str,
        request: UpdateProfileRequest,
    ) -> Result<UserDto, ServiceError> {
        let email = request.email.trim().to_ascii_lowercase();
        validate_email(&email)?;

        authorize(&self.store, principal, username).await?;
        let user = require_user(&self.store, username).await?;

        if let Some(other) = self.store.get_user_by_email(&email).await?
            && other.id != user.id
        {
            return Err(ServiceError::conflict("Email", &email));
        }

        Ok(self.store.update_user_email(user, email).await?.into())
    }

    async fn link_source_control(
        &self,
        principal: &Principal,
        username: &str,
        request: LinkSourceControlRequest,
    ) -> Result<UserDto, ServiceError> {
        let scm_username = request.username.trim().to_string();
        if scm_username.is_empty() || request.access_token.trim().is_empty() {
            return Err(ServiceError::validation(
                "Source-control username and access token are required",
            ));
        }

        authorize(&self.store, principal, username).await?;
        let user = require_user(&self.store, username).await?;

        let updated = self
            .store
            .link_scm_identity(user, scm_username, request.access_token)
            .await?;
        info!(username, "Linked source-control identity");
        Ok(updated.into())
    }

    async fn promote(&self, principal: &Principal, username: &str) -> Result<UserDto, ServiceError> {
        let acting = require_admin(&self.store, principal).await?;
        if acting.username == username {
            return Err(ServiceError::Forbidden(
                "Admins cannot change their own role".to_string(),
            ));
        }

        let target = require_user(&self.store, username).await?;
        if is_admin(&target) {
            return Err(ServiceError::Conflict(format!("{username} is already an admin")));
        }

        let updated = self
            .store
            .set_user_role(target, Role::Admin.as_str())
            .await?;
        info!(username, by = %acting.username, "User promoted to admin");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;

    async fn setup() -> (SeaOrmUserService, Principal, Principal) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let mut out = Vec::new();
        for (name, role) in [("root", Role::Admin), ("alice", Role::User)] {
            let user = store
                .create_user(NewUser {
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    password_hash: "x".to_string(),
                    role: role.as_str().to_string(),
                })
                .await
                .unwrap();
            out.push(Principal {
                id: user.id,
                username: user.username,
                email: user.email,
            });
        }
        let alice = out.pop().unwrap();
        let root = out.pop().unwrap();
        (SeaOrmUserService::new(store), root, alice)
    }

    #[tokio::test]
    async fn promotion_rules() {
        let (service, root, alice) = setup().await;

        assert!(matches!(
            service.promote(&alice, "root").await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.promote(&root, "root").await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.promote(&root, "nobody").await,
            Err(ServiceError::NotFound(_))
        ));

        let promoted = service.promote(&root, "alice").await.unwrap();
        assert_eq!(promoted.role, "admin");
        assert!(matches!(
            service.promote(&root, "alice").await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn listing_users_requires_admin() {
        let (service, root, alice) = setup().await;
        assert_eq!(service.list_users(&root).await.unwrap().len(), 2);
        assert!(service.list_users(&alice).await.is_err());
    }

    #[tokio::test]
    async fn linking_hides_token() {
        let (service, _, alice) = setup().await;
        let user = service
            .link_source_control(
                &alice,
                "alice",
                LinkSourceControlRequest {
                    username: "alice-gh".to_string(),
                    access_token: "ghp_secret".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(user.scm_linked);
        assert_eq!(user.scm_username.as_deref(), Some("alice-gh"));
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("ghp_secret"));
    }

    #[tokio::test]
    async fn email_must_be_unique() {
        let (service, _, alice) = setup().await;
        let err = service
            .update_profile(
                &alice,
                "alice",
                UpdateProfileRequest {
                    email: "root@example.com".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
