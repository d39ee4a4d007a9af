use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiJson, ApiResponse, AppState, DeletedCount};
use crate::domain::Principal;
use crate::services::DeploymentDto;
use crate::services::deployment_service::{CreateDeploymentRequest, UpdateDeploymentRequest};

/// POST /deployments/{username}/{projectName}
pub async fn create_deployment(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name)): Path<(String, String)>,
    payload: Option<ApiJson<CreateDeploymentRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<DeploymentDto>>), ApiError> {
    let request = payload.map(|ApiJson(r)| r).unwrap_or_default();
    let deployment = state
        .shared
        .deployment_service
        .create(&principal, &username, &project_name, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(deployment))))
}

/// GET /deployments/{username}
pub async fn list_user_deployments(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<Vec<DeploymentDto>>>, ApiError> {
    let deployments = state
        .shared
        .deployment_service
        .list_for_user(&principal, &username)
        .await?;
    Ok(Json(ApiResponse::success(deployments)))
}

/// GET /deployments/{username}/{projectName}
pub async fn list_project_deployments(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<DeploymentDto>>>, ApiError> {
    let deployments = state
        .shared
        .deployment_service
        .list_for_project(&principal, &username, &project_name)
        .await?;
    Ok(Json(ApiResponse::success(deployments)))
}

/// GET /deployments/{username}/{projectName}/{deploymentName}
pub async fn get_deployment(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name, deployment_name)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<DeploymentDto>>, ApiError> {
    let deployment = state
        .shared
        .deployment_service
        .get(&principal, &username, &project_name, &deployment_name)
        .await?;
    Ok(Json(ApiResponse::success(deployment)))
}

/// PUT /deployments/{username}/{projectName}/{deploymentName}
pub async fn update_deployment(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name, deployment_name)): Path<(String, String, String)>,
    ApiJson(payload): ApiJson<UpdateDeploymentRequest>,
) -> Result<Json<ApiResponse<DeploymentDto>>, ApiError> {
    let deployment = state
        .shared
        .deployment_service
        .update_status(
            &principal,
            &username,
            &project_name,
            &deployment_name,
            payload.status,
        )
        .await?;
    Ok(Json(ApiResponse::success(deployment)))
}

/// DELETE /deployments/{username}/{projectName}/{deploymentName}
pub async fn delete_deployment(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name, deployment_name)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .shared
        .deployment_service
        .delete(&principal, &username, &project_name, &deployment_name)
        .await?;
    Ok(Json(ApiResponse::message(format!(
        "Deployment {deployment_name} deleted"
    ))))
}

/// DELETE /deployments/{username}/{projectName}
pub async fn delete_project_deployments(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DeletedCount>>, ApiError> {
    let deleted = state
        .shared
        .deployment_service
        .delete_for_project(&principal, &username, &project_name)
        .await?;
    Ok(Json(ApiResponse::success(DeletedCount { deleted })))
}
