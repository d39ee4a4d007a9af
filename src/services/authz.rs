//! Ownership checks shared by the domain services.
//!
//! The acting user is re-read on every call; a role granted or revoked after
//! a token was issued takes effect on the next request.

use crate::db::Store;
use crate::domain::{Principal, Role};
use crate::entities::users;

use super::ServiceError;

/// Loads the acting user's current record.
pub async fn acting_user(store: &Store, principal: &Principal) -> Result<users::Model, ServiceError> {
    store
        .get_user(principal.id)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))
}

#[must_use]
pub fn is_admin(user: &users::Model) -> bool {
    user.role.parse::<Role>().is_ok_and(|r| r.is_admin())
}

/// Succeeds when the principal is `owner` or currently holds the admin role.
pub async fn authorize(
    store: &Store,
    principal: &Principal,
    owner: &str,
) -> Result<users::Model, ServiceError> {
    let acting = acting_user(store, principal).await?;
    if acting.username == owner || is_admin(&acting) {
        Ok(acting)
    } else {
        Err(ServiceError::forbidden())
    }
}

pub async fn require_admin(
    store: &Store,
    principal: &Principal,
) -> Result<users::Model, ServiceError> {
    let acting = acting_user(store, principal).await?;
    if is_admin(&acting) {
        Ok(acting)
    } else {
        Err(ServiceError::forbidden())
    }
}

pub async fn require_user(store: &Store, username: &str) -> Result<users::Model, ServiceError> {
    store
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", username))
}
