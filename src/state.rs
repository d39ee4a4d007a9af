use std::sync::Arc;

use rand::Rng;
use tracing::warn;

use crate::clients::github::{GithubClient, SourceControl};
use crate::clients::jenkins::{CiServer, JenkinsClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, CiRegistrationService, DefaultDeployService, DeployService, DeploymentService,
    JwtManager, LogMailer, OtpMailer, PipelineService, ProjectService, SeaOrmAuthService,
    SeaOrmDeploymentService, SeaOrmPipelineService, SeaOrmProjectService, SeaOrmUserService,
    SourceControlService, UserService,
};

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub project_service: Arc<dyn ProjectService>,

    pub pipeline_service: Arc<dyn PipelineService>,

    pub deployment_service: Arc<dyn DeploymentService>,

    pub deploy_service: Arc<dyn DeployService>,
}

impl SharedState {
    /// Connects to the database and the real GitHub and Jenkins servers.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let scm: Arc<dyn SourceControl> = Arc::new(GithubClient::new(&config.github)?);
        let ci: Arc<dyn CiServer> = Arc::new(JenkinsClient::new(&config.jenkins)?);

        Ok(Self::with_clients(config, store, scm, ci, Arc::new(LogMailer)))
    }

    /// Wires the services around already-built clients.
    #[must_use]
    pub fn with_clients(
        config: Config,
        store: Store,
        scm: Arc<dyn SourceControl>,
        ci: Arc<dyn CiServer>,
        mailer: Arc<dyn OtpMailer>,
    ) -> Self {
        let jwt = JwtManager::new(
            &jwt_secret(&config),
            config.auth.access_token_ttl_secs,
            config.auth.refresh_token_ttl_secs,
        );

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            jwt,
            config.auth.clone(),
            config.security.clone(),
            mailer,
        )) as Arc<dyn AuthService>;

        let user_service = Arc::new(SeaOrmUserService::new(store.clone())) as Arc<dyn UserService>;

        let project_service =
            Arc::new(SeaOrmProjectService::new(store.clone())) as Arc<dyn ProjectService>;

        let ci_registration = Arc::new(CiRegistrationService::new(ci, store.clone()));
        let pipeline_service = Arc::new(SeaOrmPipelineService::new(
            store.clone(),
            ci_registration,
            config.jenkins.clone(),
        )) as Arc<dyn PipelineService>;

        let deployment_service =
            Arc::new(SeaOrmDeploymentService::new(store.clone())) as Arc<dyn DeploymentService>;

        let source_control = Arc::new(SourceControlService::new(
            scm,
            config.github.default_branch.clone(),
        ));
        let deploy_service = Arc::new(DefaultDeployService::new(
            store.clone(),
            project_service.clone(),
            pipeline_service.clone(),
            deployment_service.clone(),
            source_control,
            config.jenkins.clone(),
        )) as Arc<dyn DeployService>;

        Self {
            config: Arc::new(config),
            store,
            auth_service,
            user_service,
            project_service,
            pipeline_service,
            deployment_service,
            deploy_service,
        }
    }
}

/// The configured secret, or a per-process random one when none is set.
/// Production configs are rejected earlier if the secret is missing.
fn jwt_secret(config: &Config) -> Vec<u8> {
    let secret = config.auth.jwt_secret.trim();
    if !secret.is_empty() {
        return secret.as_bytes().to_vec();
    }

    warn!("No JWT secret configured; tokens will not survive a restart");
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    bytes.to_vec()
}
