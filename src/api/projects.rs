use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiJson, ApiResponse, AppState, DeletedCount};
use crate::domain::Principal;
use crate::services::ProjectDto;
use crate::services::project_service::{CreateProjectRequest, UpdateProjectRequest};

/// POST /projects/{username}
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
    ApiJson(payload): ApiJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProjectDto>>), ApiError> {
    let project = state
        .shared
        .project_service
        .create(&principal, &username, payload)
        .await?;
    let message = format!("Project {} created", project.project_name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(project, message)),
    ))
}

/// GET /projects/{username}
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProjectDto>>>, ApiError> {
    let projects = state
        .shared
        .project_service
        .list(&principal, &username)
        .await?;
    Ok(Json(ApiResponse::success(projects)))
}

/// GET /projects/{username}/{projectName}
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ProjectDto>>, ApiError> {
    let project = state
        .shared
        .project_service
        .get(&principal, &username, &project_name)
        .await?;
    Ok(Json(ApiResponse::success(project)))
}

/// PUT /projects/{username}/{projectName}
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name)): Path<(String, String)>,
    ApiJson(payload): ApiJson<UpdateProjectRequest>,
) -> Result<Json<ApiResponse<ProjectDto>>, ApiError> {
    let project = state
        .shared
        .project_service
        .update(&principal, &username, &project_name, payload)
        .await?;
    Ok(Json(ApiResponse::success(project)))
}

/// DELETE /projects/{username}/{projectName}
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((username, project_name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .shared
        .project_service
        .delete(&principal, &username, &project_name)
        .await?;
    Ok(Json(ApiResponse::message(format!(
        "Project {project_name} deleted"
    ))))
}

/// DELETE /projects/{username}
pub async fn delete_all_projects(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<DeletedCount>>, ApiError> {
    let deleted = state
        .shared
        .project_service
        .delete_all(&principal, &username)
        .await?;
    Ok(Json(ApiResponse::success(DeletedCount { deleted })))
}
