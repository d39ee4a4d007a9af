use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiJson, ApiResponse, AppState};
use crate::domain::Principal;
use crate::services::{DeployRequest, DeployResult};

/// POST /deploy/{projectName}
pub async fn deploy_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_name): Path<String>,
    ApiJson(payload): ApiJson<DeployRequest>,
) -> Result<Json<ApiResponse<DeployResult>>, ApiError> {
    let result = state
        .shared
        .deploy_service
        .deploy(&principal, &project_name, payload)
        .await?;
    let message = format!("Project {} deployed successfully", result.project_name);
    Ok(Json(ApiResponse::with_message(result, message)))
}
