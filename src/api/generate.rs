//! Artifact previews. Nothing here touches the database or an external system.

use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiJson, ApiResponse};
use crate::generators::{
    DockerfileParams, ManifestParams, PipelineScriptParams, dockerfile, kubernetes,
    pipeline_script, technology_path,
};
use crate::services::ServiceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerfileRequest {
    pub framework: String,
    #[serde(default)]
    pub web_server: Option<String>,
    #[serde(flatten)]
    pub params: DockerfileParams,
}

#[derive(Debug, Serialize)]
pub struct GeneratedArtifact {
    pub content: String,
}

fn artifact(
    rendered: Result<String, crate::generators::GenerateError>,
) -> Result<Json<ApiResponse<GeneratedArtifact>>, ApiError> {
    let content = rendered.map_err(ServiceError::from)?;
    Ok(Json(ApiResponse::success(GeneratedArtifact { content })))
}

/// POST /generate/dockerfile
///
/// Framework defaults are not applied; every required field must be sent.
pub async fn generate_dockerfile(
    ApiJson(payload): ApiJson<DockerfileRequest>,
) -> Result<Json<ApiResponse<GeneratedArtifact>>, ApiError> {
    let technology = technology_path(&payload.framework, payload.web_server.as_deref())
        .map_err(ServiceError::from)?;
    artifact(dockerfile::generate(technology, &payload.params))
}

/// POST /generate/manifest
pub async fn generate_manifest(
    ApiJson(payload): ApiJson<ManifestParams>,
) -> Result<Json<ApiResponse<GeneratedArtifact>>, ApiError> {
    artifact(kubernetes::generate(&payload))
}

/// POST /generate/pipeline
pub async fn generate_pipeline(
    ApiJson(payload): ApiJson<PipelineScriptParams>,
) -> Result<Json<ApiResponse<GeneratedArtifact>>, ApiError> {
    artifact(pipeline_script::generate(&payload))
}
