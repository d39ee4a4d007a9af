use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::validation::{owner_or_self, parse_build_number};
use super::{ApiError, ApiJson, ApiResponse, AppState, OwnerQuery};
use crate::clients::jenkins::BuildInfo;
use crate::domain::Principal;
use crate::services::PipelineDto;
use crate::services::pipeline_service::UpdateScriptRequest;

/// POST /pipelines/{projectName}
pub async fn create_pipeline(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_name): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PipelineDto>>), ApiError> {
    let owner = owner_or_self(query.username, &principal.username);
    let pipeline = state
        .shared
        .pipeline_service
        .create(&principal, &owner, &project_name)
        .await?;
    let message = format!("Pipeline {} created", pipeline.pipeline_name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(pipeline, message)),
    ))
}

/// GET /pipelines/{projectName}
///
/// Returns the project's pipeline; `GET /pipelines` lists all of them.
pub async fn get_pipeline(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(project_name): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<PipelineDto>>, ApiError> {
    let owner = owner_or_self(query.username, &principal.username);
    let pipeline = state
        .shared
        .pipeline_service
        .get(&principal, &owner, &project_name)
        .await?;
    Ok(Json(ApiResponse::success(pipeline)))
}

/// GET /pipelines
pub async fn list_pipelines(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<Vec<PipelineDto>>>, ApiError> {
    let owner = owner_or_self(query.username, &principal.username);
    let pipelines = state
        .shared
        .pipeline_service
        .list(&principal, &owner)
        .await?;
    Ok(Json(ApiResponse::success(pipelines)))
}

/// POST /pipelines/{projectName}/{pipelineName}
pub async fn trigger_build(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((project_name, pipeline_name)): Path<(String, String)>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<PipelineDto>>, ApiError> {
    let owner = owner_or_self(query.username, &principal.username);
    let pipeline = state
        .shared
        .pipeline_service
        .trigger_build(&principal, &owner, &project_name, &pipeline_name)
        .await?;
    let message = format!("Build #{} triggered", pipeline.last_build_number);
    Ok(Json(ApiResponse::with_message(pipeline, message)))
}

/// GET /pipelines/{projectName}/{pipelineName}/{buildNumber}/status
pub async fn build_status(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((project_name, pipeline_name, build_number)): Path<(String, String, String)>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<BuildInfo>>, ApiError> {
    let build_number = parse_build_number(&build_number)?;
    let owner = owner_or_self(query.username, &principal.username);
    let build = state
        .shared
        .pipeline_service
        .build_status(&principal, &owner, &project_name, &pipeline_name, build_number)
        .await?;
    Ok(Json(ApiResponse::success(build)))
}

/// PUT /pipelines/{projectName}/{pipelineName}
pub async fn update_script(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((project_name, pipeline_name)): Path<(String, String)>,
    Query(query): Query<OwnerQuery>,
    payload: Option<ApiJson<UpdateScriptRequest>>,
) -> Result<Json<ApiResponse<PipelineDto>>, ApiError> {
    let owner = owner_or_self(query.username, &principal.username);
    let request = payload.map(|ApiJson(r)| r).unwrap_or_default();
    let pipeline = state
        .shared
        .pipeline_service
        .update_script(&principal, &owner, &project_name, &pipeline_name, request)
        .await?;
    Ok(Json(ApiResponse::with_message(pipeline, "Pipeline script updated")))
}

/// DELETE /pipelines/{projectName}/{pipelineName}
pub async fn delete_pipeline(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((project_name, pipeline_name)): Path<(String, String)>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let owner = owner_or_self(query.username, &principal.username);
    state
        .shared
        .pipeline_service
        .delete(&principal, &owner, &project_name, &pipeline_name)
        .await?;
    Ok(Json(ApiResponse::message(format!(
        "Pipeline {pipeline_name} deleted"
    ))))
}
