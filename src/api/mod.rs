use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod deploy;
mod deployments;
mod error;
mod extract;
mod generate;
mod observability;
mod pipelines;
mod projects;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use extract::ApiJson;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(observability::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh-token", post(auth::refresh_token))
        .route("/auth/sendOtp", post(auth::send_otp))
        .route("/auth/verifyOtp", post(auth::verify_otp))
        .route("/auth/resetPassword", put(auth::reset_password))
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(middleware::from_fn_with_state(
            state,
            error::expose_error_detail,
        ))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", delete(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::get_me))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}", put(users::update_profile))
        .route(
            "/users/{username}/source-control",
            put(users::link_source_control),
        )
        .route("/users/{username}/role", put(users::promote))
        .route("/deploy/{project_name}", post(deploy::deploy_project))
        .route("/projects/{username}", post(projects::create_project))
        .route("/projects/{username}", get(projects::list_projects))
        .route("/projects/{username}", delete(projects::delete_all_projects))
        .route(
            "/projects/{username}/{project_name}",
            get(projects::get_project),
        )
        .route(
            "/projects/{username}/{project_name}",
            put(projects::update_project),
        )
        .route(
            "/projects/{username}/{project_name}",
            delete(projects::delete_project),
        )
        .route("/pipelines", get(pipelines::list_pipelines))
        .route("/pipelines/{project_name}", post(pipelines::create_pipeline))
        .route("/pipelines/{project_name}", get(pipelines::get_pipeline))
        .route(
            "/pipelines/{project_name}/{pipeline_name}",
            post(pipelines::trigger_build),
        )
        .route(
            "/pipelines/{project_name}/{pipeline_name}",
            put(pipelines::update_script),
        )
        .route(
            "/pipelines/{project_name}/{pipeline_name}",
            delete(pipelines::delete_pipeline),
        )
        .route(
            "/pipelines/{project_name}/{pipeline_name}/{build_number}/status",
            get(pipelines::build_status),
        )
        .route(
            "/deployments/{username}",
            get(deployments::list_user_deployments),
        )
        .route(
            "/deployments/{username}/{project_name}",
            post(deployments::create_deployment),
        )
        .route(
            "/deployments/{username}/{project_name}",
            get(deployments::list_project_deployments),
        )
        .route(
            "/deployments/{username}/{project_name}",
            delete(deployments::delete_project_deployments),
        )
        .route(
            "/deployments/{username}/{project_name}/{deployment_name}",
            get(deployments::get_deployment),
        )
        .route(
            "/deployments/{username}/{project_name}/{deployment_name}",
            put(deployments::update_deployment),
        )
        .route(
            "/deployments/{username}/{project_name}/{deployment_name}",
            delete(deployments::delete_deployment),
        )
        .route("/generate/dockerfile", post(generate::generate_dockerfile))
        .route("/generate/manifest", post(generate::generate_manifest))
        .route("/generate/pipeline", post(generate::generate_pipeline))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
