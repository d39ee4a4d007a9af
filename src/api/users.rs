use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiJson, ApiResponse, AppState};
use crate::domain::Principal;
use crate::services::UserDto;
use crate::services::user_service::{LinkSourceControlRequest, UpdateProfileRequest};

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.shared.user_service.list_users(&principal).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// GET /users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.shared.user_service.get_me(&principal).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// GET /users/{username}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .shared
        .user_service
        .get_user(&principal, &username)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /users/{username}
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .shared
        .user_service
        .update_profile(&principal, &username, payload)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /users/{username}/source-control
pub async fn link_source_control(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
    ApiJson(payload): ApiJson<LinkSourceControlRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .shared
        .user_service
        .link_source_control(&principal, &username, payload)
        .await?;
    Ok(Json(ApiResponse::with_message(
        user,
        "Source-control account linked",
    )))
}

/// PUT /users/{username}/role
pub async fn promote(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .shared
        .user_service
        .promote(&principal, &username)
        .await?;
    let message = format!("{} is now an admin", user.username);
    Ok(Json(ApiResponse::with_message(user, message)))
}
